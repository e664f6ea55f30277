use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network error or non-2xx status.
    Transport,
    /// Successful status with a zero-byte body.
    EmptyPayload,
    /// Malformed JSON or unreadable image bytes.
    Decode,
    /// Raster decode/encode failure in a local transform.
    LocalTransform,
}

/// A failure already rendered for display in a slot or the modal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Transport, message)
    }

    pub fn empty_payload() -> Self {
        Self::new(FailureKind::EmptyPayload, "Empty or invalid result.")
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Decode, message)
    }
}
