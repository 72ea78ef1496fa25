use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Bucket shared by every user; keys are partitioned by user root prefix.
pub const DEFAULT_BUCKET: &str = "user-files";

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    pub bucket: String,
    pub in_memory: bool,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Per-user cloud drive over a flat object store")]
pub struct Args {
    /// Host to bind to (overrides CLOUD_DRIVE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides CLOUD_DRIVE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where object payloads are stored (overrides CLOUD_DRIVE_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Metadata database URL (overrides CLOUD_DRIVE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Bucket holding all user files (overrides CLOUD_DRIVE_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Keep objects in memory instead of SQLite + disk
    #[arg(long)]
    pub in_memory: bool,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        let cfg = Self::merge(args, |name| env::var(name))?;
        Ok((cfg, migrate))
    }

    /// Merge parsed arguments over values looked up with `var`.
    fn merge<F>(args: Args, var: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        // --- Environment fallback ---
        let env_or = |name: &str, default: &str| var(name).unwrap_or_else(|_| default.into());
        let env_host = env_or("CLOUD_DRIVE_HOST", "0.0.0.0");
        let env_port = match var("CLOUD_DRIVE_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing CLOUD_DRIVE_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 8080,
            Err(err) => return Err(err).context("reading CLOUD_DRIVE_PORT"),
        };
        let env_storage = env_or("CLOUD_DRIVE_STORAGE_DIR", "./data/objects");
        let env_db = env_or(
            "CLOUD_DRIVE_DATABASE_URL",
            "sqlite://./data/meta/cloud_drive.db",
        );
        let env_bucket = env_or("CLOUD_DRIVE_BUCKET", DEFAULT_BUCKET);

        // --- Merge ---
        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            bucket: args.bucket.unwrap_or(env_bucket),
            in_memory: args.in_memory,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
