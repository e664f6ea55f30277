//! UI layer for desktop GUI: app shell, result grid, modal, and texture cache.

pub mod app;
pub mod textures;

pub use app::DesktopGuiApp;
