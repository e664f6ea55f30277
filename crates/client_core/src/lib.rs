//! Client core for the background removal lab: transport to the image
//! processing backend, local pixel transforms, the slot registry and the
//! reducer-style application state, plus an async session that drives it.

pub mod config;
pub mod error;
pub mod handle;
pub mod outcome;
pub mod session;
pub mod slots;
pub mod state;
pub mod transforms;
pub mod transport;

pub use config::{load_settings, Settings};
pub use error::{DispatchError, TransformError, TransportError, UploadError};
pub use handle::ImageHandle;
pub use outcome::{interpret, ActionOutcome};
pub use session::{execute, run_transform, Session};
pub use slots::{Slot, SlotContent, SlotRegistry};
pub use state::{
    AppState, Applied, BackendRequest, ModalSelection, Notice, TransformJob, TransformStart,
};
pub use transforms::TransformKind;
pub use transport::{BackendResponse, HttpImageService, ImageService};

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
