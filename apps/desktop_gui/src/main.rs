use std::path::PathBuf;

mod backend_bridge;
mod controller;
mod ui;

use anyhow::Context;
use clap::Parser;
use client_core::{config::load_settings_from, load_settings};
use crossbeam_channel::bounded;
use eframe::egui;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::UiEvent;
use crate::ui::DesktopGuiApp;

#[derive(Debug, Parser)]
#[command(name = "desktop_gui", about = "Background removal lab desktop client")]
struct Args {
    /// Backend processing endpoint; overrides config files and environment.
    #[arg(long)]
    backend_url: Option<String>,
    /// Explicit settings file instead of the default search locations.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let settings = match &args.config {
        Some(path) => load_settings_from(path)?,
        None => load_settings(),
    }
    .with_backend_url(args.backend_url);
    settings.endpoint().context("invalid backend configuration")?;
    tracing::info!(backend_url = %settings.backend_url, "starting desktop gui");

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    backend_bridge::runtime::launch(settings, cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Background Removal Lab")
            .with_inner_size([1280.0, 820.0])
            .with_min_inner_size([960.0, 640.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };
    eframe::run_native(
        "Background Removal Lab",
        options,
        Box::new(|_cc| Ok(Box::new(DesktopGuiApp::new(cmd_tx, ui_rx)))),
    )
    .map_err(|err| anyhow::anyhow!("desktop window failed: {err}"))
}
