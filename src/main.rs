use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use campus_admin::config::Config;
use campus_admin::directory::MemoryDirectory;
use campus_admin::http::{spawn_listener, ShutdownFlag};
use campus_admin::security::SecurityLog;
use campus_admin::session::clock::SystemClock;
use campus_admin::session::{spawn_cleanup_worker, ResetTokenCache, SessionManager};
use campus_admin::storage::{MemoryStore, RedbStore, Store};
use campus_admin::AppState;

fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting campus-admin");

    let config = Config::load()?;

    let store: Arc<dyn Store> = match &config.data_dir {
        Some(dir) => Arc::new(RedbStore::open(dir)?),
        None => {
            tracing::warn!("DATA_DIR not set, sessions will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    let sessions = SessionManager::new(
        store,
        Arc::new(SystemClock),
        chrono::Duration::hours(config.sessions.timeout_hours),
    );
    let restored = sessions.load_from_store()?;
    tracing::info!(count = restored, "Restored active sessions");

    let reset_tokens = ResetTokenCache::new(chrono::Duration::minutes(
        config.sessions.reset_token_timeout_minutes,
    ));
    let security = SecurityLog::open(&config.security_log);

    let state = Arc::new(AppState {
        directory: Arc::new(MemoryDirectory::new()),
        reset_tokens,
        security,
        sessions,
        config,
    });

    let shutdown = ShutdownFlag::new();
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            tracing::info!("Shutdown signal received");
            shutdown.trigger();
        })?;
    }

    let cleanup = spawn_cleanup_worker(Arc::clone(&state), shutdown.clone())?;
    let (addr, listener) = spawn_listener(state, shutdown)?;
    tracing::info!(address = %addr, "Listening");

    listener
        .join()
        .map_err(|_| anyhow::anyhow!("listener thread panicked"))?;
    cleanup
        .join()
        .map_err(|_| anyhow::anyhow!("cleanup thread panicked"))?;

    tracing::info!("Shutdown complete");
    Ok(())
}
