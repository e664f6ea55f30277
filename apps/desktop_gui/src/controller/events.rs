//! UI/backend events and error modeling for desktop GUI controller.

use client_core::{ActionOutcome, ImageHandle, TransformError};
use shared::domain::TicketId;

pub enum UiEvent {
    Info(String),
    Error(UiError),
    SourceLoaded(ImageHandle),
    ActionCompleted {
        ticket: TicketId,
        outcome: ActionOutcome,
    },
    TransformCompleted {
        ticket: TicketId,
        result: Result<ImageHandle, TransformError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Transport,
    Decode,
    Validation,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    Upload,
    Dispatch,
    Transform,
    Export,
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("unsupported")
            || message_lower.contains("empty")
            || message_lower.contains("invalid")
            || message_lower.contains("must use http")
        {
            UiErrorCategory::Validation
        } else if message_lower.contains("decode")
            || message_lower.contains("encode")
            || message_lower.contains("format")
            || message_lower.contains("parsing")
        {
            UiErrorCategory::Decode
        } else if message_lower.contains("timeout")
            || message_lower.contains("connection")
            || message_lower.contains("network")
            || message_lower.contains("backend")
            || message_lower.contains("queue")
            || message_lower.contains("disconnect")
        {
            UiErrorCategory::Transport
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Status line text, prefixed with what the user was doing.
    pub fn status_text(&self) -> String {
        format!("{} failed: {}", context_label(self.context), self.message)
    }
}

fn context_label(context: UiErrorContext) -> &'static str {
    match context {
        UiErrorContext::BackendStartup => "Backend startup",
        UiErrorContext::Upload => "Upload",
        UiErrorContext::Dispatch => "Request",
        UiErrorContext::Transform => "Local transform",
        UiErrorContext::Export => "Export",
    }
}
