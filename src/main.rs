mod batch;
mod config;
mod confirm;
mod dashboard;
mod models;
mod sync;
mod tags;
mod utils;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use dashboard::DashboardClient;
use sync::Syncer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    let default_filter = if Config::console_logging_from_env() {
        "camsync=info,camsync::dashboard=debug"
    } else {
        "camsync=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let cfg = Config::load();
    cfg.validate()?;
    tracing::info!("Starting camsync");
    tracing::info!("Template network: {} (org {})", cfg.src_net_id, cfg.src_org_id);
    tracing::info!("Target org: {}", cfg.dst_org_id);
    tracing::info!("Network tag: {}, camera tag: {}", cfg.dst_network_tag, cfg.dst_camera_tag);
    tracing::info!("Modules: {}", cfg.modules.join(", "));

    let client = DashboardClient::new(&cfg)?;
    if !client.test_connection(&cfg.dst_org_id).await {
        tracing::warn!("Could not reach organization {} - continuing anyway", cfg.dst_org_id);
    }

    let confirm = confirm::for_mode(cfg.supervised);
    let report = Syncer::new(&client, confirm.as_ref(), &cfg).run().await?;

    for error in &report.read_errors {
        tracing::error!("Network not synced: {}", error);
    }
    tracing::info!(
        "Sync finished: {} networks, {} errors",
        report.networks.len(),
        report.error_count()
    );

    if !report.read_errors.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}
