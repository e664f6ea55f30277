use thiserror::Error;

use shared::domain::Action;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to reach backend: {0}")]
    Request(#[from] reqwest::Error),
    #[error("backend responded {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid image part mime type '{mime}': {source}")]
    InvalidMime {
        mime: String,
        source: reqwest::Error,
    },
}

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("no image loaded")]
    NoImage,
    #[error("another local transform is still running")]
    Busy,
    #[error("no saved color image to revert to")]
    MissingColorSnapshot,
    #[error("failed to decode image for local transform: {0}")]
    Decode(#[source] image::ImageError),
    #[error("failed to encode transformed image: {0}")]
    Encode(#[source] image::ImageError),
    #[error("local transform task failed: {0}")]
    Task(String),
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("file '{name}' is empty")]
    Empty { name: String },
    #[error("unsupported file type '{mime}' for '{name}'; expected JPEG, PNG or WebP")]
    UnsupportedType { name: String, mime: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("no image loaded for action {0}")]
    NoImage(Action),
    #[error("action {0} runs locally and never reaches the backend")]
    LocalAction(Action),
    #[error("action {0} only runs from the result modal")]
    ModalOnly(Action),
    #[error("result modal is not open")]
    ModalClosed,
    #[error("no image in the modal to measure")]
    NoModalImage,
    #[error("local transform failed: {0}")]
    Transform(String),
}
