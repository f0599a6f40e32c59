use std::fmt;

/// Failures that abort a run (collaborator I/O, configuration)
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Failed to fetch {system} inventory: {message}")]
    FetchFailure { system: &'static str, message: String },
    #[error("{system} API call {method} failed: {message}")]
    Api {
        system: &'static str,
        method: String,
        message: String,
    },
    #[error("Host group '{0}' not found in Zabbix, create it manually")]
    GroupNotFound(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    pub fn fetch(system: &'static str, message: impl fmt::Display) -> Self {
        SyncError::FetchFailure {
            system,
            message: message.to_string(),
        }
    }

    pub fn api(system: &'static str, method: impl Into<String>, message: impl fmt::Display) -> Self {
        SyncError::Api {
            system,
            method: method.into(),
            message: message.to_string(),
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;

/// Snapshot entry lacking a required field
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid record '{record}': {reason}")]
pub struct InvalidRecord {
    pub record: String,
    pub field: &'static str,
    pub reason: String,
}

impl InvalidRecord {
    pub fn missing_field(record: impl Into<String>, field: &'static str) -> Self {
        Self {
            record: record.into(),
            field,
            reason: format!("missing field '{field}'"),
        }
    }

    pub fn bad_value(record: impl Into<String>, field: &'static str, value: &str) -> Self {
        Self {
            record: record.into(),
            field,
            reason: format!("unexpected {field} '{value}'"),
        }
    }
}

/// Per-record anomaly: the record is skipped, the run continues
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordIssue {
    #[error(transparent)]
    InvalidRecord(#[from] InvalidRecord),
    #[error("unrecognized VMware status '{status}' for host '{host}'")]
    UnrecognizedStatus { host: String, status: String },
    #[error("host '{host}' not found in Zabbix")]
    NotFoundInTarget { host: String },
}

impl RecordIssue {
    pub fn host(&self) -> &str {
        match self {
            RecordIssue::InvalidRecord(invalid) => &invalid.record,
            RecordIssue::UnrecognizedStatus { host, .. } => host,
            RecordIssue::NotFoundInTarget { host } => host,
        }
    }
}
