use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use backbone_index::{TaxonIndex, build_index};
use backbone_match::{DefaultNameParser, MatchEngine};
use taxamatch::{AppState, router};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_CHECKLIST: &str = "checklist.zip";
const DEFAULT_INDEX_DIR: &str = "taxon-index";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = load_config();
    info!("binding to {}:{}", config.host, config.port);
    info!("using index at {}", config.index_dir.display());

    if config.reindex || !config.index_dir.join("meta.json").exists() {
        info!(
            "building index from checklist at {}",
            config.checklist_path.display()
        );
        let start = Instant::now();
        let stats = build_index(&config.checklist_path, &config.index_dir, &DefaultNameParser)
            .with_context(|| {
                format!("indexing {}", config.checklist_path.display())
            })?;
        info!(
            "indexed {} of {} usages in {} ms",
            stats.indexed,
            stats.rows,
            start.elapsed().as_millis()
        );
    }

    let index = TaxonIndex::open(&config.index_dir)
        .with_context(|| format!("opening index at {}", config.index_dir.display()))?;
    let state = AppState {
        engine: Arc::new(MatchEngine::new(index)),
    };

    let app = router(state).layer(TraceLayer::new_for_http());
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid listen address")?;
    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Clone)]
struct Config {
    host: String,
    port: u16,
    checklist_path: PathBuf,
    index_dir: PathBuf,
    reindex: bool,
}

fn load_config() -> Config {
    let mut reindex = false;
    let mut cli_checklist: Option<PathBuf> = None;
    let mut cli_index_dir: Option<PathBuf> = None;
    let mut args = env::args().skip(1).peekable();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--reindex" => reindex = true,
            "--checklist" => {
                if let Some(path) = args.next() {
                    cli_checklist = Some(PathBuf::from(path));
                }
            }
            "--index-dir" => {
                if let Some(path) = args.next() {
                    cli_index_dir = Some(PathBuf::from(path));
                }
            }
            _ => {
                if let Some(path) = arg.strip_prefix("--checklist=") {
                    cli_checklist = Some(PathBuf::from(path));
                } else if let Some(path) = arg.strip_prefix("--index-dir=") {
                    cli_index_dir = Some(PathBuf::from(path));
                }
            }
        }
    }

    let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    let checklist_path = cli_checklist
        .or_else(|| env::var("CHECKLIST_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CHECKLIST));
    let index_dir = cli_index_dir
        .or_else(|| env::var("INDEX_DIR").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_INDEX_DIR));

    Config {
        host,
        port,
        checklist_path,
        index_dir,
        reindex,
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .init();
}
