//! Process entry point: parse CLI args, load config, wire the pipeline,
//! serve.
//!
//! `clap::Parser` args, a `tracing_subscriber` init, and a thin dispatch
//! to either the racing pipeline or static-file mode depending on config.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ocsp_responder::config::AppConfig;
use ocsp_responder::http::{self, AppState};
use ocsp_responder::issuer::AdmissionFilter;
use ocsp_responder::lookup::cache::CacheLookup;
use ocsp_responder::lookup::db::DbLookup;
use ocsp_responder::lookup::LookupSource;
use ocsp_responder::resolver::Resolver;
use ocsp_responder::metrics;

#[derive(Parser, Debug)]
#[command(name = "ocsp-responder")]
#[command(author = "Lighthouse Certification Authority")]
#[command(version)]
#[command(about = "RFC 6960 OCSP responder")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "ocsp-responder.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = AppConfig::load(&args.config)
        .with_context(|| format!("loading config from {}", args.config.display()))?;

    init_tracing(&config.log_level);

    info!(listen_addr = %config.listen_addr, "starting ocsp responder");

    if let Some(static_file) = &config.static_file {
        run_static_file_mode(&config, static_file).await
    } else {
        run_racing_mode(&config).await
    }
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

async fn run_racing_mode(config: &AppConfig) -> Result<()> {
    let admission = Arc::new(AdmissionFilter::load(&config.issuers, &config.serial_prefixes)?);

    let db_config = config
        .db
        .as_ref()
        .context("racing mode requires [db] to be configured")?;

    let pool = sqlx::mysql::MySqlPoolOptions::new()
        .max_connections(db_config.max_connections)
        .acquire_timeout(Duration::from_millis(db_config.connect_timeout_ms))
        .connect(&db_config.dsn)
        .await
        .context("connecting to primary database")?;
    metrics::set_db_max_connections(db_config.max_connections);

    let primary: Arc<dyn LookupSource> = Arc::new(DbLookup::new(pool, admission.clone()));

    let secondary: Option<Arc<dyn LookupSource>> = match &config.cache {
        Some(cache_config) => {
            let client = redis::Client::open(cache_config.url.as_str())
                .context("building redis client")?;
            let manager = redis::aio::ConnectionManager::new(client)
                .await
                .context("connecting to secondary cache")?;
            Some(Arc::new(CacheLookup::new(manager)))
        }
        None => None,
    };

    let request_timeout = if config.request_timeout_ms > 0 {
        Some(Duration::from_millis(config.request_timeout_ms))
    } else {
        None
    };

    let resolver = Arc::new(Resolver::new(admission, primary, secondary, request_timeout));

    if let Some(metrics_addr) = config.metrics_listen_addr {
        metrics::install(Some(metrics_addr))?;
    } else {
        metrics::install(None)?;
    }

    serve(config, resolver).await
}

async fn run_static_file_mode(config: &AppConfig, static_file: &PathBuf) -> Result<()> {
    use ocsp_responder::lookup::static_file::StaticFileLookup;

    let lookup = StaticFileLookup::load(static_file)?;
    let admission = Arc::new(AdmissionFilter::load(&config.issuers, &config.serial_prefixes)?);
    let primary: Arc<dyn LookupSource> = Arc::new(StaticFileSource { lookup });
    let resolver = Arc::new(Resolver::new(admission, primary, None, None));

    metrics::install(config.metrics_listen_addr)?;
    serve(config, resolver).await
}

async fn serve(config: &AppConfig, resolver: Arc<Resolver>) -> Result<()> {
    let shutdown = CancellationToken::new();
    let state = AppState {
        resolver,
        path_prefix: config.path_prefix.clone(),
        max_age_seconds: config.max_age_seconds,
        root_max_age_seconds: 43_200,
        shutdown,
    };

    http::run(
        config.listen_addr,
        state,
        Duration::from_millis(config.shutdown_stop_timeout_ms),
    )
    .await
}

/// Adapts [`ocsp_responder::lookup::static_file::StaticFileLookup`]'s plain
/// synchronous map lookup to the [`LookupSource`] channel contract, so
/// static-file mode can still go through the same `Resolver` (with no
/// secondary configured, it degenerates to the single-await primary-only
/// path — the race is simply never set up in this mode).
struct StaticFileSource {
    lookup: ocsp_responder::lookup::static_file::StaticFileLookup,
}

impl LookupSource for StaticFileSource {
    fn lookup(
        &self,
        request: &ocsp_responder::ocsp::ParsedRequest,
        _cancel: CancellationToken,
    ) -> tokio::sync::oneshot::Receiver<ocsp_responder::lookup::LookupResponse> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let result = self.lookup.lookup(&request.serial_hex);
        let _ = tx.send(result);
        rx
    }
}
