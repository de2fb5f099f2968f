use eyre::Result;
use std::sync::Arc;

use crate::bridge;
use crate::cli::specials;
use crate::instruction::InstructionStore;
use crate::notify::HttpNotifier;
use crate::plugin::{Plugin, PluginState};
use crate::settings::Settings;
use crate::toggle::Toggle;

/// Assemble the plugin from settings: store, startup toggle, and the notice channel.
fn build_plugin(settings: &Settings) -> Result<Plugin> {
    let state = PluginState::new(
        InstructionStore::new(&settings.instruction_path),
        Toggle::new(settings.enabled_at_start),
    );
    let notifier = Arc::new(HttpNotifier::new(&settings.server_url)?);
    Ok(Plugin::new(state, notifier))
}

/// CLI entrypoint: answer one-shot specials, otherwise serve hooks on stdin/stdout.
pub async fn run() -> Result<()> {
    if specials::handle_specials_if_needed() {
        return Ok(());
    }

    let settings = Settings::from_env();
    // stdout carries the hook protocol, so logs only ever go to the file.
    let log = crate::logging::setup_file_logger(settings.log_path.as_deref());
    let served = serve_stdio(&settings).await;
    if let Err(error) = &served {
        tracing::error!(%error, "plugin: stopped");
    }
    if let Some(log) = log {
        log.finish().await;
    }
    served
}

async fn serve_stdio(settings: &Settings) -> Result<()> {
    let mut plugin = build_plugin(settings)?;
    tracing::info!(
        instruction_path = %plugin.state().store.path().display(),
        enabled = plugin.state().toggle.get(),
        server_url = %settings.server_url,
        "plugin: starting"
    );

    let mut reader = tokio::io::BufReader::new(tokio::io::stdin());
    let mut writer = tokio::io::stdout();
    bridge::serve(&mut plugin, &mut reader, &mut writer).await
}
