//! Worker thread that owns the tokio runtime and the HTTP image service.

pub mod commands;
pub mod runtime;
