// src/error.rs
use thiserror::Error;

/// Run-level failures. Every variant is fatal to the run.
#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("HTTP Error {status}: {reason}")]
    HttpStatus { status: u16, reason: String },

    #[error("URL Error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Error fetching feed: {0}")]
    Fetch(String),

    #[error("XML Parse Error: {0}")]
    Parse(String),
}

impl CalendarError {
    /// Short failure class used in the single diagnostic line.
    pub fn class(&self) -> &'static str {
        match self {
            CalendarError::HttpStatus { .. } => "http-status",
            CalendarError::Transport(_) => "transport",
            CalendarError::Fetch(_) => "fetch",
            CalendarError::Parse(_) => "parse",
        }
    }
}

impl From<reqwest::Error> for CalendarError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return CalendarError::HttpStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
            };
        }
        if e.is_connect() || e.is_timeout() || e.is_request() {
            CalendarError::Transport(e)
        } else {
            CalendarError::Fetch(e.to_string())
        }
    }
}
