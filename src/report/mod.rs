pub mod completion;
pub mod error;
pub mod orchestrator;
pub mod prompt;
pub mod session;
pub mod state;

pub use completion::{CompletionClient, CompletionRequest, ProxyCompletionClient};
pub use error::{FailureView, GenerationError, SessionError};
pub use orchestrator::{GenerationTimeouts, ReportOrchestrator};
pub use prompt::{HttpPromptSource, PromptSource};
pub use session::{REPORT_FILENAME, ReportArtifact, Session, SharedSession};
pub use state::{GenerationState, Stage};
