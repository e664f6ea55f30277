//! Async orchestration over [`AppState`] for callers without a UI thread.

use std::{collections::HashSet, path::Path, sync::Arc};

use shared::{
    domain::{Action, Origin, SlotId, TicketId},
    error::Failure,
};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::{
    error::{DispatchError, TransformError, UploadError},
    handle::ImageHandle,
    outcome::{interpret, ActionOutcome},
    state::{AppState, Applied, BackendRequest, TransformJob, TransformStart},
    transforms::TransformKind,
    transport::ImageService,
};

pub const ABANDONED_REQUEST_TEXT: &str = "Error: request did not complete.";

/// Performs one backend request and classifies the response.
pub async fn execute<S>(service: &S, request: &BackendRequest) -> ActionOutcome
where
    S: ImageService + ?Sized,
{
    let result = service.process(&request.image, request.action).await;
    interpret(request.action, request.image.name(), result)
}

/// Runs a transform job on the blocking pool.
pub async fn run_transform(job: TransformJob) -> Result<ImageHandle, TransformError> {
    let TransformJob { kind, source, .. } = job;
    tokio::task::spawn_blocking(move || kind.apply(&source))
        .await
        .map_err(|err| TransformError::Task(err.to_string()))?
}

/// Owns an [`AppState`] and drives it to completion for every operation.
pub struct Session<S: ImageService + ?Sized> {
    service: Arc<S>,
    state: AppState,
}

impl<S> Session<S>
where
    S: ImageService + ?Sized + 'static,
{
    pub fn new(service: Arc<S>) -> Self {
        Self {
            service,
            state: AppState::new(),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn upload(&mut self, image: ImageHandle) {
        self.state.load_source(image);
    }

    pub fn upload_path(&mut self, path: &Path) -> Result<(), UploadError> {
        let image = ImageHandle::from_path(path)?;
        self.upload(image);
        Ok(())
    }

    pub async fn toggle_grayscale(&mut self) -> Result<(), TransformError> {
        self.transform(TransformKind::Grayscale).await
    }

    pub async fn rotate(&mut self) -> Result<(), TransformError> {
        self.transform(TransformKind::Rotate).await
    }

    pub async fn transform(&mut self, kind: TransformKind) -> Result<(), TransformError> {
        let job = match self.state.begin_transform(kind)? {
            TransformStart::Restored => return Ok(()),
            TransformStart::Job(job) => job,
        };
        let ticket = job.ticket;
        let result = run_transform(job).await;
        self.state.complete_transform(ticket, result).map(|_| ())
    }

    /// Runs any action: local ones transform the current image (`None`),
    /// backend ones report where their result landed.
    pub async fn dispatch(&mut self, action: Action) -> Result<Option<Applied>, DispatchError> {
        match action {
            Action::Grayscale | Action::Rotate => {
                let kind = if action == Action::Grayscale {
                    TransformKind::Grayscale
                } else {
                    TransformKind::Rotate
                };
                self.transform(kind)
                    .await
                    .map_err(|err| DispatchError::Transform(err.to_string()))?;
                Ok(None)
            }
            _ => self.run_action(action).await.map(Some),
        }
    }

    pub async fn run_action(&mut self, action: Action) -> Result<Applied, DispatchError> {
        let request = self.state.begin_action(action, Origin::Grid)?;
        let outcome = execute(self.service.as_ref(), &request).await;
        Ok(self.state.apply_outcome(request.ticket, outcome))
    }

    /// Fans the six segmentation actions out concurrently and applies each
    /// result as it arrives. Returns once every slot has settled.
    pub async fn run_all_advanced(&mut self) -> Result<(), DispatchError> {
        let requests = self.state.begin_fan_out()?;
        let mut outstanding: HashSet<TicketId> =
            requests.iter().map(|request| request.ticket).collect();

        let mut tasks = JoinSet::new();
        for request in requests {
            let service = Arc::clone(&self.service);
            tasks.spawn(async move {
                let outcome = execute(service.as_ref(), &request).await;
                (request.ticket, request.action, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((ticket, action, outcome)) => {
                    outstanding.remove(&ticket);
                    if outcome.is_failure() {
                        warn!(action = action.wire_name(), "advanced action failed");
                    }
                    self.state.apply_outcome(ticket, outcome);
                }
                Err(err) => error!("advanced action task did not finish: {err}"),
            }
        }

        for ticket in outstanding {
            self.state.apply_outcome(
                ticket,
                ActionOutcome::Failed(Failure::transport(ABANDONED_REQUEST_TEXT)),
            );
        }
        info!("all advanced actions settled");
        Ok(())
    }

    pub fn open_modal(&mut self, slot: SlotId) -> bool {
        self.state.open_modal(slot)
    }

    pub fn close_modal(&mut self) {
        self.state.close_modal();
    }

    /// Runs `action` against the image shown in the modal.
    pub async fn measure_from_modal(&mut self, action: Action) -> Result<Applied, DispatchError> {
        let request = self.state.begin_action(action, Origin::Modal)?;
        let outcome = execute(self.service.as_ref(), &request).await;
        Ok(self.state.apply_outcome(request.ticket, outcome))
    }
}
