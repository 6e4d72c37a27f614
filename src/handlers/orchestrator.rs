use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::error::VqaError;
use crate::handlers::SessionHistory;
use crate::models::{
    AnalysisResult, AttemptPhase, AttemptStatus, ErrorKind, ErrorState, VqaQuestion, ViewState,
    COULD_NOT_ESTIMATE, RECOGNITION_ERROR,
};
use crate::services::parser::{extract_calories, normalize_name};
use crate::services::{ImageEncoding, VqaClient};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How the two questions of an attempt are issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CallStrategy {
    /// Name first, then calories
    #[default]
    Sequential,
    /// Both at once
    Concurrent,
}

impl FromStr for CallStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sequential" => Ok(CallStrategy::Sequential),
            "concurrent" | "parallel" => Ok(CallStrategy::Concurrent),
            other => Err(format!("expected 'sequential' or 'concurrent', got '{}'", other)),
        }
    }
}

impl std::fmt::Display for CallStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CallStrategy::Sequential => "sequential",
            CallStrategy::Concurrent => "concurrent",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone)]
pub struct AttemptTicket {
    id: u64,
    image: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AttemptOutcome {
    pub ticket_id: u64,
    pub status: AttemptStatus,
    /// `None` only when the image could not be encoded.
    pub result: Option<AnalysisResult>,
    pub error: Option<ErrorState>,
}

/// Runs one upload cycle. Holds no session state, so several may be in flight.
#[derive(Clone)]
pub struct AttemptRunner {
    client: Arc<dyn VqaClient>,
    strategy: CallStrategy,
}

impl AttemptRunner {
    pub fn new(client: Arc<dyn VqaClient>, strategy: CallStrategy) -> Self {
        Self { client, strategy }
    }

    pub async fn run(&self, ticket: &AttemptTicket) -> AttemptOutcome {
        log::debug!("🔄 Attempt #{}: encoding {}", ticket.id, ticket.image.display());

        let image = match ImageEncoding::from_file(&ticket.image).await {
            Ok(image) => image,
            Err(e) => {
                log::error!("❌ Attempt #{}: {}", ticket.id, e);
                let kind = ErrorKind::EncodingFailure;
                return AttemptOutcome {
                    ticket_id: ticket.id,
                    status: AttemptStatus::Failure,
                    result: None,
                    error: Some(ErrorState::new(kind, format!("{}. {}", e, kind.hint()))),
                };
            }
        };

        log::debug!("🔄 Attempt #{}: asking ({})", ticket.id, self.strategy);
        let (name, calories) = self.ask_both(&image).await;

        log::debug!("🔄 Attempt #{}: assembling", ticket.id);
        let outcome = assemble(ticket, name, calories);
        log::info!("🍽️ Attempt #{} finished: {}", ticket.id, outcome.status);
        outcome
    }

    async fn ask_both(
        &self,
        image: &ImageEncoding,
    ) -> (Result<String, VqaError>, Result<String, VqaError>) {
        match self.strategy {
            CallStrategy::Sequential => {
                let name = self.ask(image, VqaQuestion::Name).await;
                let calories = self.ask(image, VqaQuestion::Calories).await;
                (name, calories)
            }
            CallStrategy::Concurrent => tokio::join!(
                self.ask(image, VqaQuestion::Name),
                self.ask(image, VqaQuestion::Calories)
            ),
        }
    }

    async fn ask(&self, image: &ImageEncoding, question: VqaQuestion) -> Result<String, VqaError> {
        let answer = self.client.ask(image, question).await;
        match &answer {
            Ok(text) => log::info!("💬 {} answer: '{}'", question, text),
            Err(e) => log::warn!("⚠️ {} question failed: {}", question, e),
        }
        answer
    }
}

fn assemble(
    ticket: &AttemptTicket,
    name: Result<String, VqaError>,
    calories: Result<String, VqaError>,
) -> AttemptOutcome {
    let (status, error) = match (&name, &calories) {
        (Ok(_), Ok(_)) => (AttemptStatus::Success, None),
        (Err(e), Ok(_)) => (
            AttemptStatus::Partial,
            Some(ErrorState::partial(
                e.kind(),
                format!("Could not recognize the dish: {}. {}", e, e.kind().hint()),
            )),
        ),
        (Ok(_), Err(e)) => (
            AttemptStatus::Partial,
            Some(ErrorState::partial(
                e.kind(),
                format!("Could not estimate calories: {}. {}", e, e.kind().hint()),
            )),
        ),
        (Err(e), Err(_)) => (
            AttemptStatus::Failure,
            Some(ErrorState::new(
                e.kind(),
                format!("Analysis failed: {}. {}", e, e.kind().hint()),
            )),
        ),
    };

    let name = match name {
        Ok(answer) => normalize_name(Some(&answer)),
        Err(_) => RECOGNITION_ERROR.to_string(),
    };
    let calories = match calories {
        Ok(answer) => extract_calories(&answer),
        Err(_) => COULD_NOT_ESTIMATE.to_string(),
    };

    AttemptOutcome {
        ticket_id: ticket.id,
        status,
        result: Some(AnalysisResult {
            name,
            calories,
            timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
            preview: ticket.image.clone(),
        }),
        error,
    }
}

/// Owns the session: the active result, the error banner and the history.
pub struct Orchestrator {
    runner: AttemptRunner,
    phase: AttemptPhase,
    preview: Option<PathBuf>,
    active: Option<AnalysisResult>,
    error: Option<ErrorState>,
    history: SessionHistory,
    last_ticket: u64,
    last_upload: Option<PathBuf>,
}

impl Orchestrator {
    pub fn new(client: Arc<dyn VqaClient>, strategy: CallStrategy) -> Self {
        Self {
            runner: AttemptRunner::new(client, strategy),
            phase: AttemptPhase::Idle,
            preview: None,
            active: None,
            error: None,
            history: SessionHistory::new(),
            last_ticket: 0,
            last_upload: None,
        }
    }

    pub fn strategy(&self) -> CallStrategy {
        self.runner.strategy
    }

    /// Starts a new attempt; any earlier one still in flight is superseded.
    pub fn begin(&mut self, image: PathBuf) -> AttemptTicket {
        self.last_ticket += 1;
        log::info!("📸 Attempt #{} started for {}", self.last_ticket, image.display());

        self.phase = AttemptPhase::InFlight;
        self.preview = Some(image.clone());
        self.error = None;
        self.last_upload = Some(image.clone());

        AttemptTicket {
            id: self.last_ticket,
            image,
        }
    }

    /// Applies a finished attempt. Results are always recorded in history;
    /// a superseded attempt does not replace what is on display.
    pub fn complete(&mut self, outcome: AttemptOutcome) -> AttemptStatus {
        if let Some(result) = &outcome.result {
            self.history.record(result.clone());
        }

        if outcome.ticket_id != self.last_ticket {
            log::info!(
                "⏭️ Attempt #{} superseded by #{}, not displayed",
                outcome.ticket_id,
                self.last_ticket
            );
            return outcome.status;
        }

        self.phase = AttemptPhase::Done(outcome.status);
        self.active = outcome.result;
        self.error = outcome.error;
        outcome.status
    }

    pub async fn analyze(&mut self, image: PathBuf) -> AttemptStatus {
        let ticket = self.begin(image);
        let outcome = self.runner.run(&ticket).await;
        self.complete(outcome)
    }

    /// Runs a new attempt on the last uploaded file, if there is one.
    pub async fn retry(&mut self) -> Option<AttemptStatus> {
        let image = self.last_upload.clone()?;
        log::info!("🔁 Retrying {}", image.display());
        Some(self.analyze(image).await)
    }

    pub fn last_upload(&self) -> Option<&Path> {
        self.last_upload.as_deref()
    }

    pub fn can_retry(&self) -> bool {
        self.last_upload.is_some() && self.error.as_ref().map_or(false, ErrorState::is_retriable)
    }

    /// Shows a past result again without asking the model.
    pub fn select_history(&mut self, index: usize) -> bool {
        let Some(entry) = self.history.select(index).cloned() else {
            return false;
        };

        self.preview = Some(entry.preview.clone());
        self.active = Some(entry);
        self.error = None;
        true
    }

    pub fn clear_history(&mut self) {
        if self.history.is_empty() {
            return;
        }
        log::info!("🗑️ Clearing {} history entries", self.history.len());
        self.history.clear();
    }

    pub fn view(&self) -> ViewState {
        ViewState {
            phase: self.phase,
            preview: self.preview.clone(),
            active: self.active.clone(),
            error: self.error.clone(),
            history: self.history.to_vec(),
        }
    }
}
