pub mod catalog;
pub mod engine;
pub mod transcript;

pub use catalog::{Catalog, DEFAULT_HINT, Question, QuestionId, Section};
pub use engine::{Questionnaire, SectionPosition, SectionStatus};
pub use transcript::build_transcript;
