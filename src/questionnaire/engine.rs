use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use super::catalog::{Catalog, Question, QuestionId};
use super::transcript::build_transcript;

/// Where the cursor sits relative to its section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionPosition {
    pub section_index: usize,
    pub section_title: String,
    /// 1-based position of the current question within its section.
    pub question_in_section: usize,
    pub questions_in_section: usize,
}

/// A section as shown in the navigator. `start_index` is the jump target for
/// the section's first question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionStatus {
    pub title: String,
    pub start_index: usize,
    pub question_count: usize,
    pub is_current: bool,
    /// The cursor has moved past every question in the section.
    pub is_completed: bool,
}

/// Cursor and answers over a fixed catalog.
///
/// The cursor ranges over `0..=total_questions`; `total_questions` is the
/// review/generate stage.
#[derive(Debug, Clone)]
pub struct Questionnaire {
    catalog: Arc<Catalog>,
    cursor: usize,
    answers: HashMap<QuestionId, String>,
}

impl Questionnaire {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            cursor: 0,
            answers: HashMap::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn total_questions(&self) -> usize {
        self.catalog.total_questions()
    }

    pub fn is_reviewing(&self) -> bool {
        self.cursor >= self.total_questions()
    }

    pub fn answers(&self) -> &HashMap<QuestionId, String> {
        &self.answers
    }

    pub fn answer(&self, id: QuestionId) -> Option<&str> {
        self.answers.get(&id).map(String::as_str)
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    pub fn has_answers(&self) -> bool {
        !self.answers.is_empty()
    }

    /// Overwrites the answer for `id`. Returns `false`, leaving the map
    /// untouched, when `id` is not in the catalog.
    pub fn record_answer(&mut self, id: QuestionId, text: impl Into<String>) -> bool {
        if !self.catalog.contains(id) {
            return false;
        }
        self.answers.insert(id, text.into());
        true
    }

    pub fn advance(&mut self) {
        if self.cursor < self.total_questions() {
            self.cursor += 1;
        }
    }

    pub fn retreat(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Moves to `index` when it names a question; anything else is ignored.
    pub fn jump_to(&mut self, index: usize) {
        if index < self.total_questions() {
            self.cursor = index;
        }
    }

    /// Moves straight to the review stage.
    pub fn review(&mut self) {
        self.cursor = self.total_questions();
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
        self.answers.clear();
    }

    /// `(cursor + 1) / total`, or `None` at the review stage.
    pub fn progress_fraction(&self) -> Option<f64> {
        if self.is_reviewing() {
            return None;
        }
        Some((self.cursor + 1) as f64 / self.total_questions() as f64)
    }

    pub fn current_id(&self) -> Option<QuestionId> {
        self.catalog.slot(self.cursor).map(|slot| slot.id)
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.catalog.question(self.current_id()?)
    }

    pub fn section_position(&self) -> Option<SectionPosition> {
        let slot = self.catalog.slot(self.cursor)?;
        let section = self.catalog.section(slot.id.section)?;

        Some(SectionPosition {
            section_index: slot.id.section,
            section_title: section.title.clone(),
            question_in_section: self.cursor - slot.section_offset + 1,
            questions_in_section: section.questions.len(),
        })
    }

    pub fn section_overview(&self) -> Vec<SectionStatus> {
        let mut start_index = 0;
        self.catalog
            .sections()
            .iter()
            .map(|section| {
                let end = start_index + section.questions.len();
                let status = SectionStatus {
                    title: section.title.clone(),
                    start_index,
                    question_count: section.questions.len(),
                    is_current: (start_index..end).contains(&self.cursor),
                    is_completed: self.cursor >= end,
                };
                start_index = end;
                status
            })
            .collect()
    }

    pub fn build_transcript(&self) -> String {
        build_transcript(&self.catalog, &self.answers)
    }
}
