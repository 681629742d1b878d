use std::fmt;

use serde::Serialize;

pub const DEFAULT_HINT: &str = "Please provide your detailed response here...";

/// Identity of a question: its section index and its index within that section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct QuestionId {
    pub section: usize,
    pub question: usize,
}

impl QuestionId {
    pub const fn new(section: usize, question: usize) -> Self {
        Self { section, question }
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.section, self.question)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Question {
    pub prompt: String,
    pub hint: Option<String>,
}

impl Question {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn hint_or_default(&self) -> &str {
        self.hint.as_deref().unwrap_or(DEFAULT_HINT)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub title: String,
    pub questions: Vec<Question>,
}

impl Section {
    pub fn new(title: impl Into<String>, questions: Vec<Question>) -> Self {
        Self {
            title: title.into(),
            questions,
        }
    }
}

/// A question's place in the flattened ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub id: QuestionId,
    /// Number of questions in earlier sections.
    pub section_offset: usize,
}

/// Immutable ordered catalog of sections. The flattened question order is
/// computed once at construction.
#[derive(Debug, Clone)]
pub struct Catalog {
    sections: Vec<Section>,
    slots: Vec<Slot>,
}

impl Catalog {
    pub fn new(sections: Vec<Section>) -> Self {
        let mut slots = Vec::new();
        for (section_idx, section) in sections.iter().enumerate() {
            let section_offset = slots.len();
            for question_idx in 0..section.questions.len() {
                slots.push(Slot {
                    id: QuestionId::new(section_idx, question_idx),
                    section_offset,
                });
            }
        }

        Self { sections, slots }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn total_questions(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, index: usize) -> Option<Slot> {
        self.slots.get(index).copied()
    }

    pub fn section(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.sections.get(id.section)?.questions.get(id.question)
    }

    pub fn contains(&self, id: QuestionId) -> bool {
        self.question(id).is_some()
    }

    /// The USP discovery catalog used by the CLUE tool.
    pub fn clue() -> Self {
        Self::new(vec![
            Section::new(
                "Current Positioning",
                vec![
                    Question::new("What is your current value positioning and key message?")
                        .with_hint("e.g. the one-line pitch you use today and where it shows up"),
                ],
            ),
            Section::new(
                "ICP Foundation",
                vec![
                    Question::new(
                        "How would you describe your ideal customer (ICP) - company size, role, industry?",
                    )
                    .with_hint("e.g. 50-500 person SaaS companies, VP Marketing, B2B fintech"),
                    Question::new(
                        "What are your average deal sizes and current goals for the next 12-24 months?",
                    )
                    .with_hint("e.g. $25k ACV today, aiming for $60k with 40 new logos"),
                ],
            ),
            Section::new(
                "Dream Outcome & Status Elevation",
                vec![
                    Question::new(
                        "When your clients succeed with your solution, how do they get recognized internally? What makes them the hero?",
                    ),
                    Question::new(
                        "What career advancement or industry recognition do your successful clients typically achieve?",
                    ),
                ],
            ),
            Section::new(
                "Emotional & Hidden Pain Extraction",
                vec![
                    Question::new(
                        "Describe a typical stressful day for your ideal client dealing with the problem you solve.",
                    )
                    .with_hint("Walk through the morning, the escalations, the late finish"),
                    Question::new(
                        "What keeps your ideal clients up at night about this type of decision?",
                    ),
                    Question::new(
                        "What career fears do they have about making the wrong choice? What happens if it fails?",
                    ),
                ],
            ),
            Section::new(
                "Urgency & Pressure Points",
                vec![
                    Question::new(
                        "What external pressures (competitors, regulations, leadership) create urgency for them to act?",
                    ),
                    Question::new(
                        "How quickly do they need to show results to maintain internal support?",
                    )
                    .with_hint("e.g. first board update in 90 days"),
                ],
            ),
            Section::new(
                "Buying Psychology",
                vec![
                    Question::new(
                        "What proof or validation do they need before they'll stake their reputation on a solution?",
                    )
                    .with_hint("Case studies, references, pilots, analyst reports..."),
                    Question::new(
                        "Walk me through how they typically discover and evaluate solutions - who's involved?",
                    ),
                ],
            ),
            Section::new(
                "Effort & Sacrifice Barriers",
                vec![
                    Question::new(
                        "What's the most frustrating part of their current approach? What makes change feel overwhelming?",
                    ),
                    Question::new(
                        "What internal resistance do they face when proposing solutions like yours?",
                    ),
                ],
            ),
            Section::new(
                "About Your Business",
                vec![
                    Question::new(
                        "What success stories do you have? What's the common theme between them?",
                    ),
                    Question::new(
                        "What are customers saying about you that they don't say about competitors?",
                    )
                    .with_hint("Quote reviews, renewal calls or referral emails if you can"),
                ],
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Catalog {
        Catalog::new(vec![
            Section::new("A", vec![Question::new("a1"), Question::new("a2")]),
            Section::new("B", vec![Question::new("b1")]),
        ])
    }

    #[test]
    fn test_flattened_order() {
        let catalog = small();
        assert_eq!(catalog.total_questions(), 3);
        assert_eq!(catalog.slot(0).unwrap().id, QuestionId::new(0, 0));
        assert_eq!(catalog.slot(1).unwrap().id, QuestionId::new(0, 1));
        assert_eq!(catalog.slot(2).unwrap().id, QuestionId::new(1, 0));
        assert_eq!(catalog.slot(2).unwrap().section_offset, 2);
        assert!(catalog.slot(3).is_none());
    }

    #[test]
    fn test_contains() {
        let catalog = small();
        assert!(catalog.contains(QuestionId::new(1, 0)));
        assert!(!catalog.contains(QuestionId::new(1, 1)));
        assert!(!catalog.contains(QuestionId::new(2, 0)));
    }

    #[test]
    fn test_clue_catalog_shape() {
        let catalog = Catalog::clue();
        assert_eq!(catalog.sections().len(), 8);
        assert_eq!(catalog.total_questions(), 16);
        assert_eq!(catalog.sections()[0].title, "Current Positioning");
    }

    #[test]
    fn test_hint_falls_back_to_default() {
        let plain = Question::new("q");
        assert_eq!(plain.hint_or_default(), DEFAULT_HINT);
        let hinted = Question::new("q").with_hint("try this");
        assert_eq!(hinted.hint_or_default(), "try this");
    }

    #[test]
    fn test_question_id_display() {
        assert_eq!(QuestionId::new(3, 1).to_string(), "3-1");
    }
}
