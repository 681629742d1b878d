use std::collections::HashMap;
use std::fmt::Write;

use super::catalog::{Catalog, QuestionId};

pub const TRANSCRIPT_BANNER: &str = "USP-Focused Discovery Call Transcript";
pub const NO_RESPONSE: &str = "[No response provided]";

/// Renders every question of `catalog`, in catalog order, with its answer.
///
/// Output depends only on the contents of `answers`, so repeated builds from
/// the same answers are byte-identical.
pub fn build_transcript(catalog: &Catalog, answers: &HashMap<QuestionId, String>) -> String {
    let mut transcript = format!("{TRANSCRIPT_BANNER}\n\n");

    for (section_idx, section) in catalog.sections().iter().enumerate() {
        let _ = write!(transcript, "=== {} ===\n\n", section.title);

        for (question_idx, question) in section.questions.iter().enumerate() {
            let answer = answers
                .get(&QuestionId::new(section_idx, question_idx))
                .map(String::as_str)
                .filter(|a| !a.is_empty())
                .unwrap_or(NO_RESPONSE);
            let _ = write!(transcript, "Q: {}\nA: {}\n\n", question.prompt, answer);
        }
    }

    transcript
}
