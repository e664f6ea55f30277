//! Application state and the transitions that are allowed to change it.
//!
//! `AppState` is owned by a single writer (the GUI thread or a headless
//! [`Session`](crate::session::Session)). Work that needs the network or
//! raster decoding is started with a `begin_*` transition, which hands back
//! a ticketed job, and finished with the matching `apply_*`/`complete_*`
//! transition once the job reports back. Results carry their ticket so late
//! or superseded work can be recognised and dropped:
//!
//! * uploads and applied transforms bump the source generation, which
//!   invalidates every grid request computed from the previous pixels;
//! * each slot remembers only its latest ticket;
//! * modal requests are tied to the modal session that issued them.

use std::collections::HashMap;

use shared::domain::{Action, HandleId, Origin, SlotId, TicketId};
use tracing::{debug, error, info};

use crate::{
    error::{DispatchError, TransformError},
    handle::ImageHandle,
    outcome::ActionOutcome,
    slots::{Slot, SlotContent, SlotRegistry, PROCESSING_LABEL, STARTING_LABEL},
    transforms::TransformKind,
};

pub const NO_MODAL_IMAGE_TEXT: &str = "Error: no image to measure.";
pub const MEASUREMENT_DONE_TEXT: &str = "Measurement completed (image updated).";

/// One backend call to perform.
#[derive(Debug, Clone)]
pub struct BackendRequest {
    pub ticket: TicketId,
    pub action: Action,
    pub image: ImageHandle,
}

/// One local transform to perform off the state-owning thread.
#[derive(Debug, Clone)]
pub struct TransformJob {
    pub ticket: TicketId,
    pub kind: TransformKind,
    pub source: ImageHandle,
}

#[derive(Debug, Clone)]
pub enum TransformStart {
    Job(TransformJob),
    /// Grayscale toggled back to the saved color image; nothing to run.
    Restored,
}

/// Where an outcome ended up.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    Slot(SlotId),
    Modal,
    /// The action has no slot; the caller decides how to show it.
    Unbound(ActionOutcome),
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Notice::Info(message) | Notice::Error(message) => message,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notice::Error(_))
    }
}

#[derive(Debug, Clone)]
pub struct ModalSelection {
    origin: SlotId,
    session: u64,
    image: Option<ImageHandle>,
    text: Option<String>,
    status: Option<String>,
    pending: Option<TicketId>,
}

impl ModalSelection {
    pub fn origin(&self) -> SlotId {
        self.origin
    }

    pub fn image(&self) -> Option<&ImageHandle> {
        self.image.as_ref()
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Progress or result line for the modal's own action.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    action: Action,
    origin: Origin,
    target: Option<SlotId>,
    generation: u64,
    modal_session: Option<u64>,
}

#[derive(Debug, Clone, Copy)]
struct RunningTransform {
    ticket: TicketId,
    kind: TransformKind,
}

#[derive(Debug, Default)]
pub struct AppState {
    current: Option<ImageHandle>,
    last_color: Option<ImageHandle>,
    monochrome: bool,
    slots: SlotRegistry,
    modal: Option<ModalSelection>,
    generation: u64,
    next_ticket: u64,
    next_modal_session: u64,
    transform: Option<RunningTransform>,
    in_flight: HashMap<TicketId, InFlight>,
    notice: Option<Notice>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&ImageHandle> {
        self.current.as_ref()
    }

    pub fn last_color(&self) -> Option<&ImageHandle> {
        self.last_color.as_ref()
    }

    pub fn is_monochrome(&self) -> bool {
        self.monochrome
    }

    pub fn slots(&self) -> &SlotRegistry {
        &self.slots
    }

    pub fn slot(&self, id: SlotId) -> &Slot {
        self.slots.get(id)
    }

    pub fn modal(&self) -> Option<&ModalSelection> {
        self.modal.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn transform_in_flight(&self) -> Option<TransformKind> {
        self.transform.map(|running| running.kind)
    }

    pub fn requests_in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn set_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }

    /// Every handle some owner still holds: current, last-color, slots, modal.
    pub fn live_handles(&self) -> Vec<HandleId> {
        let mut ids: Vec<HandleId> = self
            .current
            .iter()
            .chain(self.last_color.iter())
            .map(ImageHandle::id)
            .chain(self.slots.image_ids())
            .chain(
                self.modal
                    .as_ref()
                    .and_then(|modal| modal.image.as_ref())
                    .map(ImageHandle::id),
            )
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    fn issue_ticket(&mut self) -> TicketId {
        self.next_ticket += 1;
        TicketId(self.next_ticket)
    }

    /// New source image: everything derived from the previous one is dropped.
    pub fn load_source(&mut self, image: ImageHandle) {
        info!(name = image.name(), bytes = image.len(), "loaded source image");
        self.notice = Some(Notice::Info(format!("Loaded {}", image.name())));
        self.current = Some(image);
        self.last_color = None;
        self.monochrome = false;
        self.slots.clear_all();
        self.modal = None;
        self.transform = None;
        self.in_flight.clear();
        self.generation += 1;
    }

    pub fn begin_transform(&mut self, kind: TransformKind) -> Result<TransformStart, TransformError> {
        let Some(current) = self.current.clone() else {
            return Err(TransformError::NoImage);
        };
        if self.transform.is_some() {
            return Err(TransformError::Busy);
        }

        if kind == TransformKind::Grayscale && self.monochrome {
            let Some(color) = self.last_color.take() else {
                self.notice = Some(Notice::Error(
                    "Error: could not revert to color.".to_string(),
                ));
                return Err(TransformError::MissingColorSnapshot);
            };
            self.current = Some(color);
            self.monochrome = false;
            self.invalidate_results();
            info!("reverted image to color");
            return Ok(TransformStart::Restored);
        }

        let ticket = self.issue_ticket();
        self.transform = Some(RunningTransform { ticket, kind });
        debug!(ticket = ticket.0, transform = kind.label(), "transform started");
        Ok(TransformStart::Job(TransformJob {
            ticket,
            kind,
            source: current,
        }))
    }

    /// `Ok(false)` when the job was superseded (e.g. by a new upload). A
    /// failed transform is recorded as an error notice and handed back.
    pub fn complete_transform(
        &mut self,
        ticket: TicketId,
        result: Result<ImageHandle, TransformError>,
    ) -> Result<bool, TransformError> {
        let running = match self.transform {
            Some(running) if running.ticket == ticket => running,
            _ => {
                debug!(ticket = ticket.0, "dropping stale transform result");
                return Ok(false);
            }
        };
        self.transform = None;

        let image = match result {
            Ok(image) => image,
            Err(err) => {
                error!(transform = running.kind.label(), "local transform failed: {err}");
                self.notice = Some(Notice::Error(format!(
                    "Local {} failed: {err}",
                    running.kind.label()
                )));
                return Err(err);
            }
        };

        if running.kind == TransformKind::Grayscale && !self.monochrome {
            self.last_color = self.current.take();
            self.monochrome = true;
        }
        self.current = Some(image);
        self.invalidate_results();
        info!(transform = running.kind.label(), "transform applied");
        Ok(true)
    }

    fn invalidate_results(&mut self) {
        self.slots.clear_all();
        self.generation += 1;
        self.in_flight
            .retain(|_, request| request.origin == Origin::Modal);
    }

    pub fn begin_action(
        &mut self,
        action: Action,
        origin: Origin,
    ) -> Result<BackendRequest, DispatchError> {
        if action.is_local() {
            return Err(DispatchError::LocalAction(action));
        }
        match origin {
            Origin::Grid => self.begin_grid_action(action),
            Origin::Modal => self.begin_modal_action(action),
        }
    }

    fn begin_grid_action(&mut self, action: Action) -> Result<BackendRequest, DispatchError> {
        if action.is_measurement_overlay() {
            return Err(DispatchError::ModalOnly(action));
        }
        let image = self.current.clone().ok_or(DispatchError::NoImage(action))?;
        let target = action.slot();
        let ticket = self.issue_ticket();
        if let Some(slot) = target {
            self.slots.mark_pending(slot, ticket, PROCESSING_LABEL);
        }
        self.track(ticket, action, Origin::Grid, target, None);
        Ok(BackendRequest {
            ticket,
            action,
            image,
        })
    }

    fn begin_modal_action(&mut self, action: Action) -> Result<BackendRequest, DispatchError> {
        let ticket = self.issue_ticket();
        let modal = self.modal.as_mut().ok_or(DispatchError::ModalClosed)?;
        let Some(image) = modal.image.clone() else {
            modal.status = Some(NO_MODAL_IMAGE_TEXT.to_string());
            return Err(DispatchError::NoModalImage);
        };
        modal.pending = Some(ticket);
        modal.status = Some(format!("Processing {}...", action.label()));
        let (origin_slot, session) = (modal.origin, modal.session);
        self.track(ticket, action, Origin::Modal, Some(origin_slot), Some(session));
        Ok(BackendRequest {
            ticket,
            action,
            image,
        })
    }

    /// Marks every advanced slot pending and returns one request per slot.
    pub fn begin_fan_out(&mut self) -> Result<Vec<BackendRequest>, DispatchError> {
        let image = self
            .current
            .clone()
            .ok_or(DispatchError::NoImage(Action::RemoveDefault))?;

        let mut requests = Vec::with_capacity(Action::ADVANCED.len());
        for action in Action::ADVANCED {
            let ticket = self.issue_ticket();
            let target = action.slot();
            if let Some(slot) = target {
                self.slots.mark_pending(slot, ticket, STARTING_LABEL);
            }
            self.track(ticket, action, Origin::Grid, target, None);
            requests.push(BackendRequest {
                ticket,
                action,
                image: image.clone(),
            });
        }
        info!(count = requests.len(), "dispatching all advanced actions");
        Ok(requests)
    }

    fn track(
        &mut self,
        ticket: TicketId,
        action: Action,
        origin: Origin,
        target: Option<SlotId>,
        modal_session: Option<u64>,
    ) {
        self.in_flight.insert(
            ticket,
            InFlight {
                action,
                origin,
                target,
                generation: self.generation,
                modal_session,
            },
        );
    }

    pub fn apply_outcome(&mut self, ticket: TicketId, outcome: ActionOutcome) -> Applied {
        let Some(request) = self.in_flight.remove(&ticket) else {
            debug!(ticket = ticket.0, "dropping result for unknown or superseded request");
            return Applied::Stale;
        };

        match request.origin {
            Origin::Grid => self.apply_grid_outcome(ticket, request, outcome),
            Origin::Modal => self.apply_modal_outcome(ticket, request, outcome),
        }
    }

    fn apply_grid_outcome(
        &mut self,
        ticket: TicketId,
        request: InFlight,
        outcome: ActionOutcome,
    ) -> Applied {
        if request.generation != self.generation {
            debug!(ticket = ticket.0, action = request.action.wire_name(), "dropping result for replaced image");
            return Applied::Stale;
        }
        let Some(slot) = request.target else {
            return Applied::Unbound(outcome);
        };

        let content = match outcome {
            ActionOutcome::Image(image) => SlotContent::Image(image),
            ActionOutcome::Text(text) => SlotContent::Text(text),
            ActionOutcome::Failed(failure) => SlotContent::Text(failure.message),
        };
        if self.slots.settle(slot, ticket, content) {
            debug!(ticket = ticket.0, slot = %slot, action = request.action.wire_name(), "slot updated");
            Applied::Slot(slot)
        } else {
            Applied::Stale
        }
    }

    fn apply_modal_outcome(
        &mut self,
        ticket: TicketId,
        request: InFlight,
        outcome: ActionOutcome,
    ) -> Applied {
        let generation = self.generation;
        let Some(modal) = self.modal.as_mut() else {
            return Applied::Stale;
        };
        if Some(modal.session) != request.modal_session || modal.pending != Some(ticket) {
            return Applied::Stale;
        }
        modal.pending = None;

        match outcome {
            ActionOutcome::Image(image) => {
                modal.image = Some(image.clone());
                modal.text = None;
                modal.status = Some(if request.action.is_measurement_overlay() {
                    MEASUREMENT_DONE_TEXT.to_string()
                } else {
                    format!("{} completed.", request.action.label())
                });
                // Measurements are exploratory and leave the grid result alone.
                // A pending grid request for the slot owns it until it settles.
                if !request.action.is_measurement_overlay() && request.generation == generation {
                    if let Some(slot) = request.target {
                        if self.slots.get(slot).ticket().is_none() {
                            self.slots.set(slot, SlotContent::Image(image));
                        }
                    }
                }
            }
            ActionOutcome::Text(text) => {
                modal.image = None;
                modal.status = Some(format!("{} completed.", request.action.label()));
                modal.text = Some(text);
            }
            ActionOutcome::Failed(failure) => {
                modal.image = None;
                modal.status = None;
                modal.text = Some(failure.message);
            }
        }
        Applied::Modal
    }

    pub fn open_modal(&mut self, slot: SlotId) -> bool {
        let selected = self.slots.get(slot);
        if !selected.is_populated() {
            return false;
        }
        self.next_modal_session += 1;
        self.modal = Some(ModalSelection {
            origin: slot,
            session: self.next_modal_session,
            image: selected.image().cloned(),
            text: selected.text().map(str::to_string),
            status: None,
            pending: None,
        });
        true
    }

    pub fn close_modal(&mut self) {
        if let Some(modal) = self.modal.take() {
            if let Some(ticket) = modal.pending {
                self.in_flight.remove(&ticket);
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/state_tests.rs"]
mod tests;
