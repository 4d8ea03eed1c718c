use crate::normalize::ConversionError;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fetch from {endpoint} failed after {attempts} attempt(s): {last_error}")]
    Fetch {
        endpoint: String,
        attempts: u32,
        last_error: String,
    },

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("Sheet access error: {0}")]
    SheetAccess(String),

    #[error("Sheet authentication error: {0}")]
    SheetAuth(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    /// Short stage label used in run reports and log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::Config(_) => "config",
            SyncError::Fetch { .. } => "fetch",
            SyncError::Conversion(_) => "conversion",
            SyncError::SheetAccess(_) => "sheet-access",
            SyncError::SheetAuth(_) => "sheet-auth",
            SyncError::Http(_) => "http",
            SyncError::Io(_) => "io",
            SyncError::Json(_) => "json",
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
