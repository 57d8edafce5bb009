use anyhow::Context;
use mission_control::config::ConfigManager;
use mission_control::db::Store;
use mission_control::http_server;
use mission_control::service::DocumentService;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_ADDR: &str = "127.0.0.1:3737";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let db_path = match std::env::var_os("MISSION_CONTROL_DB") {
        Some(path) => PathBuf::from(path),
        None => default_db_path()?,
    };
    log::info!("Database path: {:?}", db_path);

    // Initialize database
    let store = Store::open(&db_path).context("Failed to initialize database")?;

    let config = ConfigManager::new(store.clone()).context("Failed to initialize settings")?;
    let settings = config.load().await.context("Failed to load settings")?;
    for root in &settings.scan_roots {
        log::info!(
            "Scan root: {} ({})",
            root.path.display(),
            if root.recursive { "recursive" } else { "flat" }
        );
    }

    let addr: SocketAddr = std::env::var("MISSION_CONTROL_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()
        .context("Invalid MISSION_CONTROL_ADDR")?;

    let service = DocumentService::new(store.clone(), Arc::new(config));
    http_server::start_server(addr, service, shutdown_signal()).await?;

    store.close().context("Failed to close database")?;
    log::info!("Mission Control stopped");
    Ok(())
}

fn default_db_path() -> anyhow::Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "mission-control")
        .context("Failed to resolve data directory")?;
    Ok(dirs.data_dir().join("mission-control.db"))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down");
}
