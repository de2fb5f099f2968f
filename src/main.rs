//! Command-line entrypoint. The host spawns this process and talks to it over stdio.
use eyre::Result;

pub mod bridge;
pub mod cli;
pub mod command;
pub mod instruction;
pub mod logging;
pub mod notify;
pub mod plugin;
pub mod protocol;
pub mod settings;
pub mod synthesis;
pub mod toggle;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
