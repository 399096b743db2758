/// Main entry point for the rs_tty server
use anyhow::Context;
use clap::Parser;
use tracing::info;

use rs_tty::app_state::AppState;
use rs_tty::config::{Cli, ConfigLoader, init_logging};
use rs_tty::server::{build_router, run_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Load configuration, then let command line flags override it
    let mut config = ConfigLoader::new()
        .load_config(cli.config.as_deref())
        .context("Failed to load configuration")?;
    cli.apply(&mut config);

    let _log_guard = init_logging(&config.logging);
    info!("Starting rs_tty {}", env!("CARGO_PKG_VERSION"));
    info!("Shell: {} {:?}", config.shell.command, config.shell.args);

    let app_state = AppState::new(config);
    let app = build_router(app_state.clone());
    run_server(app, &app_state)
        .await
        .context("Server terminated with an error")?;
    Ok(())
}
