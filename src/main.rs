use anyhow::Result;
use axum::Router;
use cloud_drive::{
    config::AppConfig,
    routes,
    services::resource_service::ResourceService,
    storage::{
        client::ObjectStore, disk::DiskObjectStore, gateway::ObjectStoreGateway,
        memory::MemoryObjectStore,
    },
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{fs, io::ErrorKind, path::Path, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = AppConfig::from_env_and_args()?;

    tracing::info!("Starting cloud-drive with config: {:?}", cfg);

    // --- Choose the object store ---
    let store: Arc<dyn ObjectStore> = if cfg.in_memory {
        if migrate {
            anyhow::bail!("--migrate applies to the SQLite metadata store, not --in-memory");
        }
        tracing::warn!("Using in-memory object store; files are lost on exit");
        Arc::new(MemoryObjectStore::new())
    } else {
        let db = open_metadata_db(&cfg.database_url).await?;

        // --- Handle migration mode ---
        if migrate {
            DiskObjectStore::migrate(&db).await?;
            tracing::info!("Database migration complete.");
            return Ok(()); // exit after migration
        }

        if !Path::new(&cfg.storage_dir).exists() {
            fs::create_dir_all(&cfg.storage_dir)?;
            tracing::info!("Created storage directory at {}", cfg.storage_dir);
        }
        Arc::new(DiskObjectStore::new(db, cfg.storage_dir.clone()))
    };

    // --- Initialize core service ---
    let gateway = ObjectStoreGateway::new(store, cfg.bucket.clone());
    gateway.ensure_bucket().await?;
    let service = ResourceService::new(gateway);

    // --- Build router ---
    let app: Router = routes::routes::routes().with_state(service);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Open the SQLite metadata pool, creating the database file and its parent
/// directory when missing.
async fn open_metadata_db(db_url: &str) -> Result<Arc<sqlx::SqlitePool>> {
    tracing::debug!("Connecting using raw URL => {}", db_url);

    let db_path = db_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .trim_start_matches("file:");
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }

    let options = SqliteConnectOptions::from_str(db_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;
    Ok(Arc::new(pool))
}
