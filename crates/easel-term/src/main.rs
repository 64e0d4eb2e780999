use anyhow::Context;
use config::Settings;
use events::TerminalEvents;
use logging::init_tracing;
use terminal::TerminalHost;
use tracing::info;

mod config;
mod events;
mod input;
mod logging;
mod terminal;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env()?;
    init_tracing(settings.log_file.as_deref())?;

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(async_main(settings))
}

async fn async_main(settings: Settings) -> anyhow::Result<()> {
    let host = TerminalHost::enter().context("failed to set up terminal")?;
    let reports_releases = host.reports_releases();

    let mut bridge = settings
        .builder()
        .build_from_file(&settings.guest, host)
        .await
        .with_context(|| format!("failed to start guest {}", settings.guest.display()))?;

    let mut events = TerminalEvents::new(settings.refresh_hz, reports_releases);
    let result = bridge.run(&mut events).await;
    info!(ticks = bridge.ticks(), "guest stopped");
    // Restore the terminal before any error is printed.
    drop(bridge);

    result.context("guest failed")
}
