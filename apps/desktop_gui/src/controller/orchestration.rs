//! Command orchestration helpers from UI actions to backend command queue.

use crossbeam_channel::{Sender, TrySendError};

use crate::backend_bridge::commands::BackendCommand;

/// A command that never reached the worker, handed back so the caller can
/// settle whatever it would have completed.
pub struct QueueFailure {
    pub command: BackendCommand,
    pub message: String,
}

/// Queues `cmd` without blocking the frame.
pub fn dispatch_backend_command(
    cmd_tx: &Sender<BackendCommand>,
    cmd: BackendCommand,
) -> Result<(), QueueFailure> {
    let cmd_name = cmd.name();
    match cmd_tx.try_send(cmd) {
        Ok(()) => {
            tracing::debug!(command = cmd_name, "queued ui->backend command");
            Ok(())
        }
        Err(TrySendError::Full(command)) => {
            tracing::warn!(command = cmd_name, "ui->backend command queue is full");
            Err(QueueFailure {
                command,
                message: "UI command queue is full; please retry".to_string(),
            })
        }
        Err(TrySendError::Disconnected(command)) => {
            tracing::error!(command = cmd_name, "backend command processor disconnected");
            Err(QueueFailure {
                command,
                message:
                    "Backend command processor disconnected (possible startup/runtime failure); restart the app"
                        .to_string(),
            })
        }
    }
}
