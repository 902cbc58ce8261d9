use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info, warn};

use lubetrack_api as api;
use api::config::{AppConfig, BackendConfig, FileProvider};
use api::schedule::{SharedClock, SystemClock};
use api::services::advisor::{GeminiClient, MaintenanceAdvisor, TextCompletion};
use api::store::{LocalStore, SqlStore, StoreHandle};

#[derive(Parser)]
#[command(name = "lubetrack-api", version, about = "Lubrication maintenance tracker")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Persist a backend location to the override file
    SetBackend {
        #[arg(long)]
        url: String,
        #[arg(long)]
        key: Option<String>,
        /// Override file; defaults to `backend_override_path` from config
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Remove the backend override file
    ClearBackend {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Purge expired photos once and exit
    Sweep,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = api::config::load_config()?;
    api::config::init_tracing(&cfg.log_level, cfg.log_json);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cfg).await,
        Command::SetBackend { url, key, file } => {
            let provider = override_file(&cfg, file)?;
            let backend = BackendConfig::from_parts(Some(url), key)
                .ok_or_else(|| anyhow!("backend url must not be empty"))?;
            provider.save_override(&backend)?;
            info!(path = %provider.path().display(), "backend override saved");
            Ok(())
        }
        Command::ClearBackend { file } => {
            let provider = override_file(&cfg, file)?;
            provider.clear_override()?;
            info!(path = %provider.path().display(), "backend override cleared");
            Ok(())
        }
        Command::Sweep => {
            let state = build_state(cfg).await?;
            let removed = state.services.maintenance.run_retention_sweep().await?;
            info!(photos = removed, "retention sweep finished");
            Ok(())
        }
    }
}

fn override_file(cfg: &AppConfig, file: Option<PathBuf>) -> Result<FileProvider> {
    file.or_else(|| cfg.backend_override_path.clone())
        .map(FileProvider::new)
        .context("no override file given and backend_override_path is not configured")
}

/// Opens the configured backing. Failures leave the handle disconnected.
async fn open_store(cfg: &AppConfig) -> StoreHandle {
    if cfg.uses_sql_storage() {
        let Some(backend) = api::config::resolve_backend(&cfg.backend_providers()) else {
            warn!("no backend location configured; running disconnected");
            return StoreHandle::disconnected("no backend location configured");
        };
        let db_config = api::db::DbConfig::from_app_config(cfg, backend.connection_url());
        match SqlStore::connect(&db_config, cfg.auto_migrate).await {
            Ok(store) => StoreHandle::connected(store),
            Err(e) => {
                error!(error = %e, "sql store unavailable; running disconnected");
                StoreHandle::disconnected(e.to_string())
            }
        }
    } else {
        match &cfg.local_data_path {
            Some(path) => match LocalStore::open(path).await {
                Ok(store) => StoreHandle::connected(store),
                Err(e) => {
                    error!(path = %path.display(), error = %e, "local store unavailable; running disconnected");
                    StoreHandle::disconnected(e.to_string())
                }
            },
            None => {
                info!("using in-memory local store");
                StoreHandle::connected(LocalStore::in_memory())
            }
        }
    }
}

fn build_advisor(cfg: &AppConfig, clock: SharedClock) -> MaintenanceAdvisor {
    let completion = cfg
        .advisor_api_key
        .as_deref()
        .filter(|key| !key.trim().is_empty())
        .and_then(|key| match GeminiClient::new(key, cfg.advisor_model.clone()) {
            Ok(client) => Some(Arc::new(client) as Arc<dyn TextCompletion>),
            Err(e) => {
                warn!(error = %e, "advisor client could not be built");
                None
            }
        });
    if completion.is_none() {
        info!("maintenance advisor disabled");
    }
    MaintenanceAdvisor::new(completion, clock)
}

async fn build_state(cfg: AppConfig) -> Result<api::AppState> {
    let clock: SharedClock = Arc::new(SystemClock);
    let store = open_store(&cfg).await;
    let advisor = build_advisor(&cfg, clock.clone());
    Ok(api::AppState::new(cfg, store, clock, advisor))
}

async fn serve(cfg: AppConfig) -> Result<()> {
    let host: std::net::IpAddr = cfg
        .host
        .parse()
        .with_context(|| format!("invalid host {}", cfg.host))?;
    let addr = SocketAddr::new(host, cfg.port);
    let sweep_every = Duration::from_secs(cfg.retention_sweep_interval_secs);

    let state = build_state(cfg).await?;
    state.working_set.spawn(&state.feed);

    // first tick fires immediately, so the sweep also runs at startup
    let maintenance = state.services.maintenance.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_every);
        loop {
            interval.tick().await;
            match maintenance.run_retention_sweep().await {
                Ok(removed) => info!(photos = removed, "retention sweep finished"),
                Err(e) => warn!(error = %e, "retention sweep skipped"),
            }
        }
    });

    let app = api::app_router(state);

    info!("lubetrack-api listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
