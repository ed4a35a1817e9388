//! Liveness worker pool
//!
//! Re-checks listings that are still open in the store. Workers draw URLs at
//! random from one shared list, each through its own browser session, and
//! mark every listing whose page no longer shows the live marker.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::join_all;
use parking_lot::Mutex;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::browser::{BrowserSession, SessionLauncher, WaitCondition};
use crate::config::HarvestConfig;
use crate::error::BrowserError;
use crate::store::SharedStore;
use crate::utils::today;

/// Totals of one liveness pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LivenessReport {
    pub checked: usize,
    pub live: usize,
    pub marked_exited: usize,
    pub store_failures: usize,
    pub workers_started: usize,
}

#[derive(Debug, Default)]
struct Counters {
    checked: AtomicUsize,
    live: AtomicUsize,
    marked_exited: AtomicUsize,
    store_failures: AtomicUsize,
}

/// URLs waiting for a check. Entries are drawn uniformly at random.
#[derive(Debug)]
struct WorkList {
    urls: Mutex<Vec<String>>,
}

impl WorkList {
    fn new(urls: Vec<String>) -> Self {
        Self {
            urls: Mutex::new(urls),
        }
    }

    fn take(&self) -> Option<String> {
        let mut urls = self.urls.lock();
        if urls.is_empty() {
            return None;
        }
        let index = rand::rng().random_range(0..urls.len());
        Some(urls.swap_remove(index))
    }
}

/// Fixed-size pool of liveness workers.
#[derive(Debug, Clone)]
pub struct LivenessPool {
    config: Arc<HarvestConfig>,
}

impl LivenessPool {
    #[must_use]
    pub fn new(config: Arc<HarvestConfig>) -> Self {
        Self { config }
    }

    /// Check every URL in `urls` once and return when all workers have exited.
    pub async fn run<L>(
        &self,
        launcher: Arc<L>,
        store: SharedStore,
        urls: Vec<String>,
    ) -> LivenessReport
    where
        L: SessionLauncher + 'static,
    {
        let total = urls.len();
        if total == 0 {
            info!("No open listings to re-check");
            return LivenessReport::default();
        }

        let workers = self.config.liveness_workers().min(total);
        info!(urls = total, workers, "Starting liveness pass");

        let work = Arc::new(WorkList::new(urls));
        let counters = Arc::new(Counters::default());
        let started = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..workers)
            .map(|id| {
                let launcher = Arc::clone(&launcher);
                let store = store.clone();
                let config = Arc::clone(&self.config);
                let work = Arc::clone(&work);
                let counters = Arc::clone(&counters);
                let started = Arc::clone(&started);
                tokio::spawn(async move {
                    let label = format!("liveness-{id}");
                    let mut session = match launcher.launch(&label).await {
                        Ok(session) => session,
                        Err(e) => {
                            warn!(worker = id, error = %e, "Liveness worker could not start a session");
                            return;
                        }
                    };
                    started.fetch_add(1, Ordering::Relaxed);
                    worker_loop(id, &mut session, &store, &config, &work, &counters).await;
                    if let Err(e) = session.quit().await {
                        warn!(worker = id, error = %e, "Failed to quit liveness session");
                    }
                })
            })
            .collect();

        for (id, joined) in join_all(handles).await.into_iter().enumerate() {
            if let Err(e) = joined {
                warn!(worker = id, error = %e, "Liveness worker task aborted");
            }
        }

        let leftover = work.urls.lock().len();
        if leftover > 0 {
            warn!(leftover, "Liveness pass ended with unchecked URLs");
        }

        let report = LivenessReport {
            checked: counters.checked.load(Ordering::Relaxed),
            live: counters.live.load(Ordering::Relaxed),
            marked_exited: counters.marked_exited.load(Ordering::Relaxed),
            store_failures: counters.store_failures.load(Ordering::Relaxed),
            workers_started: started.load(Ordering::Relaxed),
        };
        info!(
            checked = report.checked,
            live = report.live,
            marked_exited = report.marked_exited,
            "Liveness pass finished"
        );
        report
    }
}

async fn worker_loop<S: BrowserSession>(
    id: usize,
    session: &mut S,
    store: &SharedStore,
    config: &HarvestConfig,
    work: &WorkList,
    counters: &Counters,
) {
    while let Some(url) = work.take() {
        counters.checked.fetch_add(1, Ordering::Relaxed);
        match check_live(session, config, &url).await {
            Ok(()) => {
                debug!(worker = id, %url, "Listing still live");
                counters.live.fetch_add(1, Ordering::Relaxed);
            }
            Err(reason) => {
                debug!(worker = id, %url, %reason, "Listing gone");
                match store.mark_exited(&url, today()).await {
                    Ok(true) => {
                        info!(worker = id, %url, "Marked listing exited");
                        counters.marked_exited.fetch_add(1, Ordering::Relaxed);
                    }
                    // Closed by the harvest pass in the meantime
                    Ok(false) => {}
                    Err(e) => {
                        warn!(worker = id, %url, error = %e, "Could not mark listing exited");
                        counters.store_failures.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        }
    }
    debug!(worker = id, "Work list empty; worker exiting");
}

/// A listing is live when its marker appears in time. Any error means gone.
async fn check_live<S: BrowserSession>(
    session: &mut S,
    config: &HarvestConfig,
    url: &str,
) -> Result<(), BrowserError> {
    session.navigate(url).await?;
    session
        .wait_until(
            &WaitCondition::Present(config.liveness_marker().clone()),
            config.liveness_timeout(),
        )
        .await?;
    Ok(())
}
