//! Folds backend events into [`AppState`] and turns UI intents into commands.

use client_core::{
    ActionOutcome, AppState, Applied, DispatchError, Notice, TransformError, TransformKind,
    TransformStart,
};
use shared::{
    domain::{Action, Origin},
    error::Failure,
};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};
use crate::controller::orchestration::QueueFailure;

pub fn reduce(state: &mut AppState, event: UiEvent) {
    match event {
        UiEvent::Info(message) => state.set_notice(Notice::Info(message)),
        UiEvent::Error(err) => {
            tracing::warn!(
                category = ?err.category(),
                context = ?err.context(),
                "{}",
                err.message()
            );
            state.set_notice(Notice::Error(err.status_text()));
        }
        UiEvent::SourceLoaded(image) => state.load_source(image),
        UiEvent::ActionCompleted { ticket, outcome } => {
            if let Applied::Unbound(outcome) = state.apply_outcome(ticket, outcome) {
                state.set_notice(unbound_notice(outcome));
            }
        }
        UiEvent::TransformCompleted { ticket, result } => {
            // failures already land in the notice
            let _ = state.complete_transform(ticket, result);
        }
    }
}

fn unbound_notice(outcome: ActionOutcome) -> Notice {
    match outcome {
        ActionOutcome::Text(text) => Notice::Info(text),
        ActionOutcome::Image(image) => {
            Notice::Info(format!("Received {} ({} bytes)", image.name(), image.len()))
        }
        ActionOutcome::Failed(failure) => Notice::Error(failure.message),
    }
}

pub fn transform_command(state: &mut AppState, kind: TransformKind) -> Option<BackendCommand> {
    match state.begin_transform(kind) {
        Ok(TransformStart::Job(job)) => Some(BackendCommand::Transform(job)),
        Ok(TransformStart::Restored) | Err(TransformError::MissingColorSnapshot) => None,
        Err(err) => {
            state.set_notice(Notice::Error(format!("{} unavailable: {err}", kind.label())));
            None
        }
    }
}

pub fn fan_out_command(state: &mut AppState) -> Option<BackendCommand> {
    match state.begin_fan_out() {
        Ok(requests) => Some(BackendCommand::Dispatch(requests)),
        Err(err) => {
            state.set_notice(Notice::Error(format!("Cannot run advanced processes: {err}")));
            None
        }
    }
}

pub fn modal_command(state: &mut AppState, action: Action) -> Option<BackendCommand> {
    match state.begin_action(action, Origin::Modal) {
        Ok(request) => Some(BackendCommand::Dispatch(vec![request])),
        // the modal shows this one itself
        Err(DispatchError::NoModalImage) => None,
        Err(err) => {
            state.set_notice(Notice::Error(err.to_string()));
            None
        }
    }
}

/// Settles the tickets of a command that never reached the worker.
pub fn settle_unsent(state: &mut AppState, failure: QueueFailure) {
    let QueueFailure { command, message } = failure;
    let context = match &command {
        BackendCommand::Transform(_) => UiErrorContext::Transform,
        BackendCommand::LoadFile { .. } => UiErrorContext::Upload,
        BackendCommand::SaveImage { .. } => UiErrorContext::Export,
        BackendCommand::Dispatch(_) => UiErrorContext::Dispatch,
    };
    match command {
        BackendCommand::Dispatch(requests) => {
            for request in requests {
                state.apply_outcome(
                    request.ticket,
                    ActionOutcome::Failed(Failure::transport(format!("Error: {message}"))),
                );
            }
        }
        BackendCommand::Transform(job) => {
            let _ = state.complete_transform(job.ticket, Err(TransformError::Task(message.clone())));
        }
        BackendCommand::LoadFile { .. } | BackendCommand::SaveImage { .. } => {}
    }
    let err = UiError::from_message(context, message);
    state.set_notice(Notice::Error(err.status_text()));
}
