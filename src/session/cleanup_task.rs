use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, instrument};

use super::{generators::Clock, store::InMemorySessionStore};

/// Starts the background task that periodically drops expired sessions.
///
/// Expired tokens already fail validation on their own; this only reclaims
/// the memory their records hold.
#[instrument(skip(store, clock))]
pub async fn start_session_sweeper(
    store: Arc<InMemorySessionStore>,
    clock: Arc<dyn Clock>,
    sweep_interval: Duration,
) {
    info!(
        sweep_interval_secs = sweep_interval.as_secs(),
        "Starting expired session sweeper"
    );

    let mut ticker = interval(sweep_interval);

    loop {
        ticker.tick().await;

        let removed = store.purge_expired(clock.now()).await;
        if removed > 0 {
            info!(removed_sessions = removed, "Expired sessions swept");
        }
    }
}
