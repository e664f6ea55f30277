use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    config::load_settings_from, load_settings, ActionOutcome, Applied, HttpImageService,
    ImageHandle, Session, Settings, Slot, SlotContent, TransformKind,
};
use shared::domain::Action;

#[derive(Parser, Debug)]
#[command(name = "headless", about = "Drive the background removal backend without a window")]
struct Cli {
    /// Backend processing endpoint; overrides config files and environment.
    #[arg(long, global = true)]
    backend_url: Option<String>,
    /// Explicit settings file instead of the default search locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run all six segmentation models and write every slot to disk.
    RunAll {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        transforms: TransformArgs,
    },
    /// Run one action by its wire name (e.g. `remover_carvekit`, `medida_rapida`).
    Action {
        #[arg(value_parser = parse_action)]
        action: Action,
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Apply local transforms only.
    Transform {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        transforms: TransformArgs,
    },
}

#[derive(Args, Debug, Clone, Copy)]
struct TransformArgs {
    /// Convert to black and white before anything else.
    #[arg(long)]
    grayscale: bool,
    /// Number of clockwise quarter turns.
    #[arg(long, default_value_t = 0)]
    rotate: u8,
}

fn parse_action(raw: &str) -> Result<Action, String> {
    Action::from_wire_name(raw).ok_or_else(|| {
        let known: Vec<&str> = Action::ALL.iter().map(|action| action.wire_name()).collect();
        format!("unknown action '{raw}'; expected one of: {}", known.join(", "))
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = resolve_settings(&cli)?;
    let service = HttpImageService::from_settings(&settings)?;
    tracing::info!(endpoint = service.endpoint(), "using backend");
    let mut session = Session::new(Arc::new(service));

    match cli.command {
        Command::RunAll {
            image,
            out,
            transforms,
        } => run_all(&mut session, &image, &out, transforms).await,
        Command::Action { action, image, out } => {
            run_single(&mut session, action, &image, out.as_deref()).await
        }
        Command::Transform {
            image,
            out,
            transforms,
        } => transform_only(&mut session, &image, &out, transforms).await,
    }
}

fn resolve_settings(cli: &Cli) -> Result<Settings> {
    let settings = match &cli.config {
        Some(path) => load_settings_from(path)?,
        None => load_settings(),
    };
    Ok(settings.with_backend_url(cli.backend_url.clone()))
}

async fn prepare(
    session: &mut Session<HttpImageService>,
    image: &Path,
    transforms: TransformArgs,
) -> Result<()> {
    session
        .upload_path(image)
        .with_context(|| format!("cannot upload '{}'", image.display()))?;
    if transforms.grayscale {
        session.transform(TransformKind::Grayscale).await?;
    }
    for _ in 0..transforms.rotate % 4 {
        session.transform(TransformKind::Rotate).await?;
    }
    Ok(())
}

async fn run_all(
    session: &mut Session<HttpImageService>,
    image: &Path,
    out: &Path,
    transforms: TransformArgs,
) -> Result<()> {
    prepare(session, image, transforms).await?;
    session.run_all_advanced().await?;

    fs::create_dir_all(out).with_context(|| format!("cannot create '{}'", out.display()))?;
    println!("{:<6} {:<20} {}", "slot", "action", "result");
    for (slot, action) in session.state().slots().iter().zip(Action::ADVANCED) {
        let summary = match write_slot(out, slot)? {
            Some(path) => format!("{} -> {}", describe(slot.content()), path.display()),
            None => describe(slot.content()),
        };
        println!("{:<6} {:<20} {summary}", slot.id().key(), action.wire_name());
    }
    Ok(())
}

async fn run_single(
    session: &mut Session<HttpImageService>,
    action: Action,
    image: &Path,
    out: Option<&Path>,
) -> Result<()> {
    prepare(session, image, TransformArgs { grayscale: false, rotate: 0 }).await?;

    match session.dispatch(action).await? {
        None => {
            let current = session.state().current().context("no image after transform")?;
            emit_image(out, action.wire_name(), current)
        }
        Some(Applied::Slot(slot_id)) => {
            let slot = session.state().slot(slot_id);
            if let SlotContent::Text(text) = slot.content() {
                bail!("{action} failed: {text}");
            }
            match out {
                Some(dir) => {
                    fs::create_dir_all(dir)
                        .with_context(|| format!("cannot create '{}'", dir.display()))?;
                    if let Some(path) = write_slot(dir, slot)? {
                        println!("{}", path.display());
                    }
                    Ok(())
                }
                None => {
                    println!("{slot_id}: {}", describe(slot.content()));
                    Ok(())
                }
            }
        }
        Some(Applied::Unbound(ActionOutcome::Text(text))) => {
            println!("{text}");
            Ok(())
        }
        Some(Applied::Unbound(ActionOutcome::Image(result))) => {
            emit_image(out, action.wire_name(), &result)
        }
        Some(Applied::Unbound(ActionOutcome::Failed(failure))) => {
            bail!("{action} failed: {}", failure.message)
        }
        Some(Applied::Modal | Applied::Stale) => bail!("{action} result was discarded"),
    }
}

async fn transform_only(
    session: &mut Session<HttpImageService>,
    image: &Path,
    out: &Path,
    transforms: TransformArgs,
) -> Result<()> {
    prepare(session, image, transforms).await?;
    let current = session.state().current().context("no image loaded")?;
    fs::write(out, current.bytes()).with_context(|| format!("cannot write '{}'", out.display()))?;
    println!("{}", out.display());
    Ok(())
}

fn emit_image(out: Option<&Path>, stem: &str, image: &ImageHandle) -> Result<()> {
    let Some(dir) = out else {
        println!("{} ({}, {} bytes)", image.name(), image.mime(), image.len());
        return Ok(());
    };
    fs::create_dir_all(dir).with_context(|| format!("cannot create '{}'", dir.display()))?;
    let path = dir.join(format!("{stem}.{}", image.extension()));
    fs::write(&path, image.bytes()).with_context(|| format!("cannot write '{}'", path.display()))?;
    println!("{}", path.display());
    Ok(())
}

/// Writes a settled slot as `slotN.<ext>` or `slotN.txt`.
fn write_slot(dir: &Path, slot: &Slot) -> Result<Option<PathBuf>> {
    let (path, bytes) = match slot.content() {
        SlotContent::Image(image) => (
            dir.join(format!("{}.{}", slot.id().key(), image.extension())),
            image.bytes().to_vec(),
        ),
        SlotContent::Text(text) => (
            dir.join(format!("{}.txt", slot.id().key())),
            text.as_bytes().to_vec(),
        ),
        SlotContent::Empty | SlotContent::Pending(_) => return Ok(None),
    };
    fs::write(&path, bytes).with_context(|| format!("cannot write '{}'", path.display()))?;
    Ok(Some(path))
}

fn describe(content: &SlotContent) -> String {
    match content {
        SlotContent::Empty => "empty".to_string(),
        SlotContent::Pending(label) => label.clone(),
        SlotContent::Image(image) => format!("image ({}, {} bytes)", image.mime(), image.len()),
        SlotContent::Text(text) => text.lines().next().unwrap_or_default().to_string(),
    }
}
