use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use localcloud::{Config, Database, Enricher, FileService, HttpAnalysisClient, UserRepository};

#[tokio::main]
async fn main() {
    // Load configuration
    let mut config = match Config::load("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    config.apply_env_overrides();

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        std::process::exit(1);
    }

    // Initialize logging
    if let Err(e) = localcloud::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        localcloud::logging::init_console_only(&config.logging.level);
    }

    info!("LocalCloud - personal file storage");

    let db = match Database::open(&config.database.path, config.database.max_connections).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    let mut service = FileService::new(db.clone(), &config.storage);

    if config.analysis.enabled {
        match HttpAnalysisClient::new(&config.analysis) {
            Ok(client) => {
                let enricher = Enricher::new(
                    Arc::new(client),
                    Duration::from_secs(config.analysis.process_timeout_secs),
                )
                .with_request_timeout(Duration::from_secs(config.analysis.request_timeout_secs));
                service = service.with_enricher(enricher);
            }
            Err(e) => warn!("Analysis disabled: {}", e),
        }
    }

    match UserRepository::new(db.pool()).count().await {
        Ok(users) => info!(users, "Database ready at {}", config.database.path),
        Err(e) => warn!("Failed to count users: {}", e),
    }

    if config.storage.default_quota_mb > 0 {
        info!("Default storage quota: {} MB", config.storage.default_quota_mb);
    } else {
        info!("Default storage quota: unlimited");
    }

    if config.analysis.enabled {
        let available = service.analysis_available().await;
        info!(
            available,
            "Analysis service at {}", config.analysis.base_url
        );
    }

    db.close().await;
}
