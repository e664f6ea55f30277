//! Runtime bridge between UI command queue and backend event intake.

use std::{path::Path, sync::Arc, thread};

use client_core::{
    execute, run_transform, session::ABANDONED_REQUEST_TEXT, ActionOutcome, BackendRequest,
    HttpImageService, ImageHandle, ImageService, Settings,
};
use crossbeam_channel::{Receiver, Sender};
use shared::error::Failure;
use tokio::task::JoinHandle;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

pub fn launch(settings: Settings, cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Backend worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let service = match HttpImageService::from_settings(&settings) {
                Ok(service) => service,
                Err(err) => {
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                        UiErrorContext::BackendStartup,
                        format!("backend worker startup failure: {err:#}"),
                    )));
                    tracing::error!("invalid backend configuration: {err:#}");
                    return;
                }
            };
            tracing::info!(endpoint = service.endpoint(), "backend worker ready");
            let _ = ui_tx.try_send(UiEvent::Info(format!(
                "Backend worker ready ({})",
                service.endpoint()
            )));
            let service: Arc<dyn ImageService> = Arc::new(service);

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    BackendCommand::LoadFile { path } => {
                        tracing::info!(path = %path.display(), "backend: load_file");
                        let event = match load_file(&path).await {
                            Ok(image) => UiEvent::SourceLoaded(image),
                            Err(message) => UiEvent::Error(UiError::from_message(
                                UiErrorContext::Upload,
                                message,
                            )),
                        };
                        deliver(&ui_tx, event);
                    }
                    BackendCommand::Dispatch(requests) => {
                        tracing::info!(count = requests.len(), "backend: dispatch");
                        for request in requests {
                            spawn_request(Arc::clone(&service), request, ui_tx.clone());
                        }
                    }
                    BackendCommand::Transform(job) => {
                        tracing::info!(transform = job.kind.label(), "backend: transform");
                        let ui_tx = ui_tx.clone();
                        tokio::spawn(async move {
                            let ticket = job.ticket;
                            let result = run_transform(job).await;
                            deliver(&ui_tx, UiEvent::TransformCompleted { ticket, result });
                        });
                    }
                    BackendCommand::SaveImage { image, path } => {
                        tracing::info!(path = %path.display(), "backend: save_image");
                        let event = match tokio::fs::write(&path, image.bytes()).await {
                            Ok(()) => UiEvent::Info(format!("Saved image to {}", path.display())),
                            Err(err) => UiEvent::Error(UiError::from_message(
                                UiErrorContext::Export,
                                format!("failed to write '{}': {err}", path.display()),
                            )),
                        };
                        deliver(&ui_tx, event);
                    }
                }
            }
            tracing::info!("ui command queue closed; backend worker exiting");
        });
    });
}

/// Runs one request and always reports its ticket back, even when the
/// request task panics or is cancelled.
fn spawn_request(
    service: Arc<dyn ImageService>,
    request: BackendRequest,
    ui_tx: Sender<UiEvent>,
) -> JoinHandle<()> {
    let ticket = request.ticket;
    let action = request.action;
    let task = tokio::spawn(async move { execute(service.as_ref(), &request).await });
    tokio::spawn(async move {
        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(action = action.wire_name(), "request task did not finish: {err}");
                ActionOutcome::Failed(Failure::transport(ABANDONED_REQUEST_TEXT))
            }
        };
        deliver(&ui_tx, UiEvent::ActionCompleted { ticket, outcome });
    })
}

async fn load_file(path: &Path) -> Result<ImageHandle, String> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || ImageHandle::from_path(&path))
        .await
        .map_err(|err| format!("upload task failed: {err}"))?
        .map_err(|err| err.to_string())
}

// Completion events must not be dropped or their slot stays pending.
fn deliver(ui_tx: &Sender<UiEvent>, event: UiEvent) {
    if ui_tx.send(event).is_err() {
        tracing::warn!("ui event queue disconnected; dropping backend event");
    }
}
