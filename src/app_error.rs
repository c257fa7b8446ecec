use crate::config::ConfigError;
use crate::data_manager::DataError;
use crate::nav_engine::NavError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AppErrorKind {
    System,
    Data,
    Config,
    Navigation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppErrorPayload {
    pub kind: AppErrorKind,
    pub message: String,
    pub detail: Option<String>,
    pub recoverable: bool,
}

#[derive(Debug, Clone)]
pub struct AppError {
    kind: AppErrorKind,
    message: String,
    detail: Option<String>,
    recoverable: bool,
}

impl AppError {
    pub fn new(kind: AppErrorKind, message: impl Into<String>, recoverable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
            recoverable,
        }
    }

    pub fn with_detail(
        kind: AppErrorKind,
        message: impl Into<String>,
        detail: impl Into<String>,
        recoverable: bool,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: Some(detail.into()),
            recoverable,
        }
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::System, message, true)
    }

    /// A system failure after which the session state cannot be trusted.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::System, message, false)
    }

    pub fn kind(&self) -> AppErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn is_recoverable(&self) -> bool {
        self.recoverable
    }

    pub fn payload(&self) -> AppErrorPayload {
        AppErrorPayload {
            kind: self.kind,
            message: self.message.clone(),
            detail: self.detail.clone(),
            recoverable: self.recoverable,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{} ({detail})", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for AppError {}

impl From<NavError> for AppError {
    fn from(error: NavError) -> Self {
        let detail = error.to_string();
        let message = match error {
            NavError::InvalidTransition { .. } => "That action is not available right now",
            NavError::StaleOperation => "This step was replaced by a newer one",
            NavError::MissingBooking => "No booking found for this trip",
            NavError::MissingLocation => "Your location has not been detected yet",
            NavError::UnknownLocation(_) => "Pick a gate from the list",
            NavError::AlreadyComplete => "You have already arrived",
        };
        Self::with_detail(AppErrorKind::Navigation, message, detail, true)
    }
}

impl From<DataError> for AppError {
    fn from(error: DataError) -> Self {
        let detail = error.to_string();
        let message = match error {
            DataError::Io(_) => "Failed to read or write saved data",
            DataError::Serde(_) => "Saved data is in an unexpected format",
            DataError::DateTime(_) => "Failed to read a saved date",
        };
        Self::with_detail(AppErrorKind::Data, message, detail, true)
    }
}

impl From<ConfigError> for AppError {
    fn from(error: ConfigError) -> Self {
        Self::with_detail(
            AppErrorKind::Config,
            "Configuration could not be loaded",
            error.to_string(),
            false,
        )
    }
}
