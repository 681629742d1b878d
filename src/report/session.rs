use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::questionnaire::{Catalog, QuestionId, Questionnaire};

use super::error::{GenerationError, SessionError};
use super::state::{GenerationState, Stage};

pub const REPORT_FILENAME: &str = "usp-analysis-report.txt";

pub type SharedSession = Arc<Mutex<Session>>;

/// What a started generation needs to carry out of the session lock.
#[derive(Debug, Clone)]
pub struct GenerationTicket {
    pub generation_id: Uuid,
    pub transcript: String,
}

/// Downloadable copy of a finished report. The content is the report text,
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifact {
    pub filename: &'static str,
    pub content_type: &'static str,
    pub content: String,
}

/// One user's questionnaire plus the single generation state that goes with it.
#[derive(Debug)]
pub struct Session {
    questionnaire: Questionnaire,
    generation: GenerationState,
}

impl Session {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            questionnaire: Questionnaire::new(catalog),
            generation: GenerationState::Idle,
        }
    }

    pub fn shared(catalog: Arc<Catalog>) -> SharedSession {
        Arc::new(Mutex::new(Self::new(catalog)))
    }

    pub fn questionnaire(&self) -> &Questionnaire {
        &self.questionnaire
    }

    pub fn generation(&self) -> &GenerationState {
        &self.generation
    }

    pub fn stage(&self) -> Stage {
        Stage::derive(self.questionnaire.is_reviewing(), &self.generation)
    }

    fn ensure_editable(&self) -> Result<(), SessionError> {
        match self.stage() {
            Stage::Generating => Err(SessionError::Busy),
            Stage::Complete => Err(SessionError::ReportReady),
            Stage::Answering | Stage::ReadyToGenerate => Ok(()),
        }
    }

    pub fn record_answer(
        &mut self,
        id: QuestionId,
        text: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.ensure_editable()?;
        if !self.questionnaire.record_answer(id, text) {
            return Err(SessionError::UnknownQuestion(id));
        }
        Ok(())
    }

    pub fn advance(&mut self) -> Result<(), SessionError> {
        self.ensure_editable()?;
        self.questionnaire.advance();
        Ok(())
    }

    pub fn retreat(&mut self) -> Result<(), SessionError> {
        self.ensure_editable()?;
        self.questionnaire.retreat();
        Ok(())
    }

    pub fn jump_to(&mut self, index: usize) -> Result<(), SessionError> {
        self.ensure_editable()?;
        self.questionnaire.jump_to(index);
        Ok(())
    }

    pub fn review(&mut self) -> Result<(), SessionError> {
        self.ensure_editable()?;
        self.questionnaire.review();
        Ok(())
    }

    /// Starts a generation: checks preconditions, moves to the review stage,
    /// marks the session in flight and snapshots the transcript.
    ///
    /// A finished report is only left through [`Session::reset`].
    pub fn begin_generation(&mut self) -> Result<GenerationTicket, GenerationError> {
        match self.stage() {
            Stage::Generating => return Err(GenerationError::AlreadyInFlight),
            Stage::Complete => return Err(GenerationError::ReportReady),
            Stage::Answering | Stage::ReadyToGenerate => {}
        }
        if !self.questionnaire.has_answers() {
            return Err(GenerationError::NoResponses);
        }

        let generation_id = Uuid::new_v4();
        self.questionnaire.review();
        self.generation = GenerationState::InFlight {
            generation_id,
            started_at: Utc::now(),
        };

        Ok(GenerationTicket {
            generation_id,
            transcript: self.questionnaire.build_transcript(),
        })
    }

    /// Settles the generation identified by `generation_id`. Outcomes for any
    /// other generation are dropped.
    pub fn finish_generation(
        &mut self,
        generation_id: Uuid,
        outcome: Result<String, GenerationError>,
    ) -> bool {
        let current = match &self.generation {
            GenerationState::InFlight { generation_id, .. } => *generation_id,
            _ => return false,
        };
        if current != generation_id {
            return false;
        }

        self.generation = match outcome {
            Ok(report) => GenerationState::Succeeded {
                report,
                generated_at: Utc::now(),
            },
            Err(err) => GenerationState::Failed(err),
        };
        true
    }

    /// "Start new analysis": clears answers, cursor and generation state.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        if self.generation.is_in_flight() {
            return Err(SessionError::Busy);
        }
        self.questionnaire.reset();
        self.generation = GenerationState::Idle;
        Ok(())
    }

    pub fn report_artifact(&self) -> Option<ReportArtifact> {
        self.generation.report().map(|report| ReportArtifact {
            filename: REPORT_FILENAME,
            content_type: "text/plain; charset=utf-8",
            content: report.to_string(),
        })
    }
}
