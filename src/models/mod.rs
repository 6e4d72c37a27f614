use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const NAME_QUESTION: &str = "What is the name of this dish?";
pub const CALORIES_QUESTION: &str =
    "What is the approximate calorie content per 100g of this dish in kcal?";

pub const NOT_RECOGNIZED: &str = "not recognized";
pub const RECOGNITION_ERROR: &str = "recognition error";
pub const COULD_NOT_ESTIMATE: &str = "could not estimate";

/// The two questions asked about every photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VqaQuestion {
    Name,
    Calories,
}

impl VqaQuestion {
    pub fn text(self) -> &'static str {
        match self {
            VqaQuestion::Name => NAME_QUESTION,
            VqaQuestion::Calories => CALORIES_QUESTION,
        }
    }
}

impl std::fmt::Display for VqaQuestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VqaQuestion::Name => "name",
            VqaQuestion::Calories => "calories",
        };
        write!(f, "{}", s)
    }
}

/// One completed analysis. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub name: String,
    pub calories: String,  // "<n> kcal/100g" or the placeholder
    pub timestamp: String,
    pub preview: PathBuf,
}

impl AnalysisResult {
    pub fn calorie_level(&self) -> CalorieLevel {
        crate::services::parser::calorie_level(&self.calories)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalorieLevel {
    Low,       // < 100 kcal/100g
    Moderate,  // < 300 kcal/100g
    High,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    Success,
    Partial,
    Failure,
}

impl std::fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AttemptStatus::Success => "success",
            AttemptStatus::Partial => "partial",
            AttemptStatus::Failure => "failure",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttemptPhase {
    #[default]
    Idle,
    InFlight,
    Done(AttemptStatus),
}

/// User-facing classification of what went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    EncodingFailure,
    TransportFailure,
    Timeout,
    UpstreamBusy,
    UpstreamRejected,
    UpstreamError,
    PartialAnswer,
}

impl ErrorKind {
    pub fn hint(self) -> &'static str {
        match self {
            ErrorKind::EncodingFailure => "The file could not be read. Pick another photo.",
            ErrorKind::TransportFailure => "Check your network connection and that the relay is running, then retry.",
            ErrorKind::Timeout => "The model may still be starting up. Retry in a moment.",
            ErrorKind::UpstreamBusy => "The model is loading. Retry in 20-30 seconds.",
            ErrorKind::UpstreamRejected => "The relay rejected the request. Check the relay URL and configuration.",
            ErrorKind::UpstreamError => "The model service failed. Retrying may help.",
            ErrorKind::PartialAnswer => "Only part of the analysis succeeded. Retry for a complete result.",
        }
    }

    pub fn is_retriable(self) -> bool {
        !matches!(self, ErrorKind::UpstreamRejected)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::EncodingFailure => "encoding failure",
            ErrorKind::TransportFailure => "network failure",
            ErrorKind::Timeout => "timeout",
            ErrorKind::UpstreamBusy => "model busy",
            ErrorKind::UpstreamRejected => "request rejected",
            ErrorKind::UpstreamError => "model error",
            ErrorKind::PartialAnswer => "partial answer",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorState {
    pub kind: ErrorKind,
    /// Classification of the failed call when `kind` is `PartialAnswer`.
    pub cause: Option<ErrorKind>,
    pub message: String,
}

impl ErrorState {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            cause: None,
            message: message.into(),
        }
    }

    pub fn partial(cause: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::PartialAnswer,
            cause: Some(cause),
            message: message.into(),
        }
    }

    pub fn is_retriable(&self) -> bool {
        self.kind.is_retriable() && self.cause.map_or(true, ErrorKind::is_retriable)
    }
}

/// Everything the presentation layer needs to draw a frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub phase: AttemptPhase,
    pub preview: Option<PathBuf>,
    pub active: Option<AnalysisResult>,
    pub error: Option<ErrorState>,
    pub history: Vec<AnalysisResult>,
}

impl ViewState {
    pub fn is_loading(&self) -> bool {
        self.phase == AttemptPhase::InFlight
    }
}
