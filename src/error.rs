//! Error types shared across the session components

use std::io;
use thiserror::Error;

/// Failure reading or writing the persisted session store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("session store is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A question payload that cannot be turned into a test
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("malformed question payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("question payload contains no questions")]
    Empty,
}

/// Failure while the controller applies an event
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A payload rejected by setup
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Payload(PayloadError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The stored submission record cannot be read back
#[derive(Debug, Error)]
pub enum ResultsError {
    #[error("stored submission is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}
