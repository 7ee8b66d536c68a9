use std::{sync::Arc, time::Duration};

use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info};

use crate::domain::repositories::LinkRepository;

/// Periodically retires expired links so they stop occupying their
/// `(owner, url)` uniqueness slot.
///
/// Resolution already ignores expired rows; this only keeps storage tidy.
/// Runs until the task is aborted.
pub async fn run_link_sweeper(links: Arc<dyn LinkRepository>, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(interval_secs = every.as_secs(), "Link sweeper started");

    loop {
        ticker.tick().await;

        match links.purge_expired().await {
            Ok(0) => {}
            Ok(purged) => {
                metrics::counter!("links_purged_total").increment(purged);
                info!(count = purged, "Purged expired links");
            }
            Err(e) => {
                error!(error = %e, "Failed to purge expired links");
            }
        }
    }
}
