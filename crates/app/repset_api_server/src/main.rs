//! Repset API server binary.
//!
//! Serves auth, profile rows, avatar storage, and the workout catalog.
//! Prints `{"port": N}` to stdout so a supervising process can discover the
//! bound port.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use repset_api::accounts::MemoryAccountStore;
use repset_api::services::token::RevocationList;
use repset_api::store::{FsBlobStore, PgAccountStore, PgProfileStore};
use repset_core::memory::{MemoryBlobStore, MemoryProfileStore};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "repset_api_server", about = "Repset API server")]
struct Args {
    /// Port to listen on (0 = ephemeral).
    #[arg(long, default_value_t = 4600)]
    port: u16,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/repset"
    )]
    database_url: String,

    /// Serve everything from memory: no PostgreSQL, no files on disk.
    /// Data is gone when the process exits.
    #[arg(long, default_value_t = false)]
    memory: bool,

    /// Directory for uploaded avatars. Defaults to the user data dir.
    #[arg(long, env = "AVATAR_DIR")]
    avatar_dir: Option<PathBuf>,

    /// Base URL avatar addresses are minted under. Defaults to the bind
    /// address.
    #[arg(long, env = "PUBLIC_BASE")]
    public_base: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Write logs to stderr so stdout is reserved for the JSON port message.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,repset_api=debug,repset_core=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    let bind_addr = format!("127.0.0.1:{}", args.port);

    // Environment first, command line wins.
    let mut config = repset_api::config::ApiConfig::from_env();
    config.bind_addr = bind_addr.clone();
    config.pg_connection_url = args.database_url.clone();
    if let Some(dir) = &args.avatar_dir {
        config.avatar_dir = dir.clone();
    }
    config.public_base = args
        .public_base
        .clone()
        .unwrap_or_else(|| format!("http://{bind_addr}"));
    let public_base = config.public_base.clone();

    let state = if args.memory {
        info!("memory mode: nothing will be persisted");
        repset_api::AppState {
            accounts: Arc::new(MemoryAccountStore::new()),
            profiles: Arc::new(MemoryProfileStore::new()),
            blobs: Arc::new(MemoryBlobStore::with_public_base(format!(
                "{public_base}/storage"
            ))),
            revoked: RevocationList::new(),
            config: config.clone(),
        }
    } else {
        info!(database_url = %args.database_url, "connecting to PostgreSQL");
        let pool = PgPoolOptions::new()
            .max_connections(args.max_connections)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect(&args.database_url)
            .await?;

        info!("running database migrations");
        repset_api::migrate(&pool).await?;

        repset_api::AppState {
            accounts: Arc::new(PgAccountStore::new(pool.clone())),
            profiles: Arc::new(PgProfileStore::new(pool)),
            blobs: Arc::new(FsBlobStore::new(
                config.avatar_dir.clone(),
                public_base.clone(),
            )),
            revoked: RevocationList::new(),
            config: config.clone(),
        }
    };

    let app = repset_api::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    let local_addr = listener.local_addr()?;

    // Report the bound port as JSON on stdout for supervising processes.
    println!("{}", serde_json::json!({"port": local_addr.port()}));
    info!(addr = %local_addr, "API listening");

    axum::serve(listener, app).await?;
    Ok(())
}
