use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, error};

use crate::http::shutdown::ShutdownFlag;
use crate::AppState;

/// Start the background expiry worker on its own thread.
///
/// Each cycle sweeps expired sessions from the cache (mirroring deletes to
/// the store) and then bulk-deletes expired rows the cache never saw. The
/// sleep between cycles is chunked so shutdown is never delayed by the full
/// interval.
pub fn spawn_cleanup_worker(
    state: Arc<AppState>,
    shutdown: ShutdownFlag,
) -> std::io::Result<JoinHandle<()>> {
    let interval = Duration::from_secs(state.config.sessions.cleanup_interval_seconds);

    std::thread::Builder::new()
        .name("cleanup-worker".to_string())
        .spawn(move || {
            debug!(interval_seconds = interval.as_secs(), "Cleanup worker started");
            while shutdown.is_running() {
                run_cleanup(&state);
                if !shutdown.sleep_interruptibly(interval) {
                    break;
                }
            }
            debug!("Cleanup worker stopped");
        })
}

fn run_cleanup(state: &AppState) {
    match state.sessions.sweep_expired() {
        Ok(count) if count > 0 => debug!(sessions_cleaned = count, "Expired sessions cleaned"),
        Ok(_) => {}
        Err(e) => error!(error = %e, "Failed to clean up expired sessions"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::test_state;
    use chrono::Utc;

    #[test]
    fn test_worker_sweeps_and_stops() {
        let (state, clock) = test_state();
        let session = state
            .sessions
            .create(1, "a@example.com", "127.0.0.1", "Linux")
            .unwrap();

        clock.advance(chrono::Duration::hours(25));

        let shutdown = ShutdownFlag::new();
        let handle = spawn_cleanup_worker(Arc::clone(&state), shutdown.clone()).unwrap();

        // First cycle runs before the first sleep; give it a moment
        let deadline = Utc::now() + chrono::Duration::seconds(5);
        while state.sessions.cached_count() > 0 && Utc::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        assert_eq!(state.sessions.cached_count(), 0);
        assert!(state.sessions.validate(&session.token).unwrap().is_none());

        shutdown.trigger();
        handle.join().unwrap();
    }
}
