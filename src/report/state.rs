use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::error::GenerationError;

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationState {
    Idle,
    InFlight {
        generation_id: Uuid,
        started_at: DateTime<Utc>,
    },
    Succeeded {
        report: String,
        generated_at: DateTime<Utc>,
    },
    Failed(GenerationError),
}

impl GenerationState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, GenerationState::InFlight { .. })
    }

    pub fn report(&self) -> Option<&str> {
        match self {
            GenerationState::Succeeded { report, .. } => Some(report),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&GenerationError> {
        match self {
            GenerationState::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GenerationState::Idle => "idle",
            GenerationState::InFlight { .. } => "in_flight",
            GenerationState::Succeeded { .. } => "succeeded",
            GenerationState::Failed(_) => "failed",
        }
    }
}

/// UI-facing stage, derived from the cursor and the generation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Answering,
    ReadyToGenerate,
    Generating,
    Complete,
}

impl Stage {
    pub fn derive(reviewing: bool, generation: &GenerationState) -> Self {
        match generation {
            GenerationState::InFlight { .. } => Stage::Generating,
            GenerationState::Succeeded { .. } => Stage::Complete,
            GenerationState::Idle | GenerationState::Failed(_) if reviewing => {
                Stage::ReadyToGenerate
            }
            GenerationState::Idle | GenerationState::Failed(_) => Stage::Answering,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_derivation() {
        let in_flight = GenerationState::InFlight {
            generation_id: Uuid::new_v4(),
            started_at: Utc::now(),
        };
        let done = GenerationState::Succeeded {
            report: "r".to_string(),
            generated_at: Utc::now(),
        };
        let failed = GenerationState::Failed(GenerationError::EmptyReport);

        let cases = vec![
            (false, GenerationState::Idle, Stage::Answering),
            (true, GenerationState::Idle, Stage::ReadyToGenerate),
            (true, failed.clone(), Stage::ReadyToGenerate),
            (false, failed, Stage::Answering),
            (true, in_flight, Stage::Generating),
            (true, done, Stage::Complete),
        ];

        for (reviewing, state, expected) in cases {
            assert_eq!(
                Stage::derive(reviewing, &state),
                expected,
                "reviewing={reviewing} state={}",
                state.label()
            );
        }
    }

    #[test]
    fn test_accessors() {
        let done = GenerationState::Succeeded {
            report: "text".to_string(),
            generated_at: Utc::now(),
        };
        assert_eq!(done.report(), Some("text"));
        assert!(done.error().is_none());
        assert!(!done.is_in_flight());
    }
}
