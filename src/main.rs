//! AgriGuard - crop disease diagnosis backend

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agriguard::{
    config::Args,
    diseases::select_store,
    server::{self, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("agriguard={},info", log_level).into()),
        )
        .with(args.log_json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!args.log_json).then(tracing_subscriber::fmt::layer))
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  AgriGuard - crop disease diagnosis");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!(
        "MongoDB: {}",
        if args.mongodb_uri.trim().is_empty() { "disabled" } else { args.mongodb_uri.as_str() }
    );
    info!("Static diseases: {}", args.diseases_json.display());
    info!("Images: {}", args.image_dir.display());
    info!("Predictions: {}", args.predictions_dir.display());
    info!("======================================");

    // The only startup failure: no usable disease data at all
    let selected = match select_store(&args.store_config()).await {
        Ok(selected) => selected,
        Err(e) => {
            error!("Disease database unavailable: {}", e);
            std::process::exit(1);
        }
    };

    let state = Arc::new(AppState::new(args, selected).await?);

    server::run(state).await?;

    Ok(())
}
