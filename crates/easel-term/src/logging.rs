use std::{fs::OpenOptions, path::Path, sync::Mutex};

use anyhow::Context;
use tracing::Level;
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Send tracing output to `log_file`, filtered by `RUST_LOG` (default `info`).
///
/// Without a file nothing is installed: stdout belongs to the surface.
pub fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<()> {
    let Some(path) = log_file else {
        return Ok(());
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let envfilter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env()
        .context("failed to read env filter")?;

    tracing_subscriber::Registry::default()
        .with(
            tracing_subscriber::fmt::Layer::default()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(envfilter),
        )
        .init();
    Ok(())
}
