use std::path::PathBuf;
use std::sync::Arc;

use contenthub::config::default_config_path;
use contenthub::{load_config, Config, ContentHubError};
use contenthub_server::{init_tracing, router, AppState};
use tracing::{error, info, warn};

const ENV_CONFIG_PATH: &str = "CONTENTHUB_CONFIG";

/// Explicit path from the environment, else the per-user default if it
/// exists, else built-in defaults. Environment overrides apply last.
fn resolve_config() -> Result<Config, ContentHubError> {
    let explicit = std::env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from);
    let path = explicit.or_else(|| default_config_path().filter(|p| p.is_file()));

    let mut config = match path {
        Some(path) => {
            info!(path = %path.display(), "Loading config");
            load_config(&path)?
        }
        None => Config::default(),
    };
    config.apply_env()?;
    contenthub::config::validate_config(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    if let Err(e) = run().await {
        error!(error = %e, "Server stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config()?;
    let state = Arc::new(AppState::from_config(&config)?);

    let recovered = state.runner.recover_interrupted().await?;
    if recovered > 0 {
        warn!(count = recovered, "Recovered jobs interrupted by the last shutdown");
    }

    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(
        address = %address,
        data_home = %config.data_home.display(),
        "Video Content Hub API listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
