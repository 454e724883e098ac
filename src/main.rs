use actix_web::{web, App, HttpServer};
use clap::{Parser, ValueEnum};
use promptforge::api::{self, AppState};
use promptforge::refine::Refiner;
use promptforge::remote::{OfflineMirror, PostgresMirror, RemoteMirror};
use promptforge::storage::{FileSystemStore, LocalStore, SqliteStore};
use promptforge::PromptState;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StorageKind {
    Filesystem,
    Sqlite,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Port to run the server on
    #[arg(long, env = "PROMPTFORGE_PORT", default_value_t = 8080)]
    port: u16,

    /// Address to bind
    #[arg(long, env = "PROMPTFORGE_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Local storage backend
    #[arg(long, value_enum, env = "PROMPTFORGE_STORAGE", default_value = "filesystem")]
    storage: StorageKind,

    /// Directory holding the local store
    #[arg(long, env = "PROMPTFORGE_DATA_DIR", default_value = "./promptforge-data")]
    data_dir: PathBuf,

    /// PostgreSQL URL of the remote mirror; local-only when absent
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    db_url: Option<String>,

    /// Owner whose records this session serves
    #[arg(long, env = "PROMPTFORGE_OWNER", default_value = "local")]
    owner: String,

    /// Minimum simulated refinement latency, in milliseconds
    #[arg(long, default_value_t = 1000)]
    refine_delay_ms: u64,

    /// Extra random refinement latency, up to this many milliseconds
    #[arg(long, default_value_t = 2000)]
    refine_jitter_ms: u64,
}

async fn open_local(args: &Cli) -> anyhow::Result<Arc<dyn LocalStore>> {
    Ok(match args.storage {
        StorageKind::Filesystem => {
            info!(path = %args.data_dir.display(), "Using filesystem storage");
            Arc::new(FileSystemStore::new(&args.data_dir))
        }
        StorageKind::Sqlite => {
            let path = args.data_dir.join("promptforge.db");
            info!(path = %path.display(), "Using SQLite storage");
            let store = SqliteStore::open(&path).await?;
            store.init_schema().await?;
            Arc::new(store)
        }
    })
}

async fn open_remote(args: &Cli) -> anyhow::Result<Arc<dyn RemoteMirror>> {
    let Some(db_url) = args.db_url.as_deref() else {
        info!("No remote database configured, running local-only");
        return Ok(Arc::new(OfflineMirror));
    };
    let mirror = PostgresMirror::connect_lazy(db_url)?;
    match mirror.init_schema().await {
        Ok(()) => info!("Remote schema initialized (if not exists)"),
        Err(e) => warn!(error = %e, "Remote unreachable at startup, mirror writes will still be attempted"),
    }
    Ok(Arc::new(mirror))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Use `RUST_LOG=info` (or debug, trace, etc.) to control log level
    // Example: RUST_LOG=promptforge=debug cargo run
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Cli::parse();
    info!(port = args.port, storage = ?args.storage, owner = %args.owner, "Starting promptforge");

    let local = open_local(&args).await?;
    let remote = open_remote(&args).await?;

    let prompts = PromptState::new(args.owner.clone(), local, remote);
    prompts.load().await?;

    let data = web::Data::new(AppState {
        prompts,
        refiner: Refiner::new(
            Duration::from_millis(args.refine_delay_ms),
            Duration::from_millis(args.refine_jitter_ms),
        ),
    });

    let addr = (args.host.clone(), args.port);
    info!(host = %addr.0, port = addr.1, "Starting HTTP server");
    HttpServer::new(move || App::new().app_data(data.clone()).configure(api::configure))
        .bind(addr)?
        .run()
        .await?;
    Ok(())
}
