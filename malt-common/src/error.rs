use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum MaltError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Resource Not Found: {0}")]
    NotFound(String),

    #[error("Parse Error in '{formula}' (line {line}): {reason}")]
    Parse {
        formula: String,
        line: usize,
        reason: String,
    },

    #[error("Unknown predicate in '{formula}' (line {line}): {predicate}")]
    UnknownPredicate {
        formula: String,
        line: usize,
        predicate: String,
    },

    #[error("Guard evaluation failed: {0}")]
    GuardEvaluation(String),

    #[error("Dependency cycle detected: {}", .0.join(" -> "))]
    CycleDetected(Vec<String>),

    #[error("Missing dependencies: {}", .0.join(", "))]
    MissingDependency(Vec<String>),

    #[error("Version '{version}' of '{formula}' is not installed")]
    VersionNotInstalled { formula: String, version: String },

    #[error("'{formula}' is already linked to {version}. Unlink first.")]
    AlreadyLinked { formula: String, version: String },

    #[error("Registry Error: {0}")]
    Registry(String),

    #[error("Platform Error: {0}")]
    Platform(String),

    #[error("Generic Error: {0}")]
    Generic(String),
}

impl From<std::io::Error> for MaltError {
    fn from(err: std::io::Error) -> Self {
        MaltError::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for MaltError {
    fn from(err: serde_json::Error) -> Self {
        MaltError::Json(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, MaltError>;
