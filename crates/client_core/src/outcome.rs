//! Turns a transport result into what a slot or the modal should show.

use shared::{
    domain::{Action, ResponseKind},
    error::Failure,
};

use crate::{
    error::TransportError,
    handle::ImageHandle,
    transport::BackendResponse,
};

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Image(ImageHandle),
    /// Pretty-printed JSON.
    Text(String),
    Failed(Failure),
}

impl ActionOutcome {
    /// Display text for text-like outcomes.
    pub fn text(&self) -> Option<&str> {
        match self {
            ActionOutcome::Image(_) => None,
            ActionOutcome::Text(text) => Some(text),
            ActionOutcome::Failed(failure) => Some(&failure.message),
        }
    }

    pub fn image(&self) -> Option<&ImageHandle> {
        match self {
            ActionOutcome::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ActionOutcome::Failed(_))
    }
}

/// Classifies `result` by the action's static response kind. `source_name`
/// names the derived image after the file it was computed from.
pub fn interpret(
    action: Action,
    source_name: &str,
    result: Result<BackendResponse, TransportError>,
) -> ActionOutcome {
    let response = match result {
        Ok(response) => response,
        Err(err) => {
            return ActionOutcome::Failed(Failure::transport(format!(
                "Error: no response from server ({err})"
            )))
        }
    };

    match action.response_kind() {
        ResponseKind::Json => interpret_json(action, &response.body),
        ResponseKind::Image => interpret_image(action, source_name, response),
    }
}

fn interpret_json(action: Action, body: &[u8]) -> ActionOutcome {
    let parsed = serde_json::from_slice::<serde_json::Value>(body)
        .and_then(|value| serde_json::to_string_pretty(&value));
    match parsed {
        Ok(text) => ActionOutcome::Text(text),
        Err(err) => {
            tracing::error!(action = action.wire_name(), "failed to parse JSON result: {err}");
            ActionOutcome::Failed(Failure::decode(format!(
                "Error parsing JSON for {action}: {err}"
            )))
        }
    }
}

fn interpret_image(action: Action, source_name: &str, response: BackendResponse) -> ActionOutcome {
    if response.body.is_empty() {
        tracing::warn!(action = action.wire_name(), "backend returned an empty image body");
        return ActionOutcome::Failed(Failure::empty_payload());
    }

    if let Err(err) = image::guess_format(&response.body) {
        tracing::error!(action = action.wire_name(), "backend returned unreadable image: {err}");
        return ActionOutcome::Failed(Failure::decode(format!(
            "Error loading image for {action}: {err}"
        )));
    }

    let fallback_mime = response
        .content_type
        .as_deref()
        .filter(|mime| mime.starts_with("image/"));
    ActionOutcome::Image(ImageHandle::derived(
        source_name,
        fallback_mime,
        response.body,
    ))
}
