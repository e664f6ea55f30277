//! Backend commands queued from UI to backend worker.

use std::path::PathBuf;

use client_core::{BackendRequest, ImageHandle, TransformJob};

pub enum BackendCommand {
    LoadFile { path: PathBuf },
    Dispatch(Vec<BackendRequest>),
    Transform(TransformJob),
    SaveImage { image: ImageHandle, path: PathBuf },
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::LoadFile { .. } => "load_file",
            BackendCommand::Dispatch(_) => "dispatch",
            BackendCommand::Transform(_) => "transform",
            BackendCommand::SaveImage { .. } => "save_image",
        }
    }
}
