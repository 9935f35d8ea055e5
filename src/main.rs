use anyhow::{Context, Result};
use clap::Parser;

use rusty_teller::config::ServerConfig;
use rusty_teller::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();
    telemetry::init("info");

    rusty_teller::run(&config, std::io::stdout())
        .await
        .with_context(|| format!("server on {} failed", config.listen))
}
