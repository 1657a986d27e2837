//! Background task that sweeps expired conversations at every local midnight.
//!
//! Nothing starts on its own: the host calls [`ExpiryScheduler::start`] once
//! during initialization and [`ExpiryScheduler::stop`] on shutdown.

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::clock::Clock;
use crate::error::WriteOutcome;
use crate::records::RecordStore;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Emitted after every completed sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub remaining: usize,
    pub outcome: WriteOutcome,
    pub ran_at: DateTime<Local>,
}

struct Running {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

pub struct ExpiryScheduler {
    store: Arc<RecordStore>,
    clock: Arc<dyn Clock>,
    reports: broadcast::Sender<SweepReport>,
    running: Mutex<Option<Running>>,
}

impl std::fmt::Debug for ExpiryScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiryScheduler")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl ExpiryScheduler {
    pub fn new(store: Arc<RecordStore>, clock: Arc<dyn Clock>) -> Self {
        let (reports, _) = broadcast::channel(16);
        Self {
            store,
            clock,
            reports,
            running: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SweepReport> {
        self.reports.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Sweep now, then after every local midnight. Returns `false` if the
    /// task is already running. Must be called within a tokio runtime.
    pub fn start(&self) -> bool {
        let mut running = self.running.lock();
        if running.is_some() {
            tracing::debug!("expiry scheduler already running");
            return false;
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run(
            self.store.clone(),
            self.clock.clone(),
            self.reports.clone(),
            shutdown_rx,
        ));

        *running = Some(Running { shutdown, handle });
        tracing::info!("expiry scheduler started");
        true
    }

    /// Signal the task to exit and wait for it.
    pub async fn stop(&self) {
        let running = self.running.lock().take();
        let Some(Running { shutdown, handle }) = running else {
            return;
        };

        shutdown.send(true).ok();
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "expiry scheduler task ended abnormally");
        }
        tracing::info!("expiry scheduler stopped");
    }
}

async fn run(
    store: Arc<RecordStore>,
    clock: Arc<dyn Clock>,
    reports: broadcast::Sender<SweepReport>,
    mut shutdown: watch::Receiver<bool>,
) {
    // The process may not have been running at the last midnight.
    sweep_once(&store, clock.as_ref(), &reports).await;

    loop {
        if *shutdown.borrow() {
            break;
        }

        let delay = until_next_midnight(clock.now());
        tracing::debug!(delay_secs = delay.as_secs(), "next expiry sweep scheduled");

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => break,
        }

        sweep_once(&store, clock.as_ref(), &reports).await;
    }
}

async fn sweep_once(
    store: &Arc<RecordStore>,
    clock: &dyn Clock,
    reports: &broadcast::Sender<SweepReport>,
) {
    let ran_at = clock.now();
    let today = ran_at.date_naive();
    let task_store = store.clone();

    // A panic inside the sweep surfaces as a JoinError and never reaches
    // storage, so the persisted history stays as it was.
    match tokio::task::spawn_blocking(move || task_store.sweep_expired(today)).await {
        Ok(result) => {
            if !result.outcome.is_durable() {
                tracing::warn!(removed = result.removed, "expiry sweep could not be persisted");
            }
            reports
                .send(SweepReport {
                    removed: result.removed,
                    remaining: result.remaining,
                    outcome: result.outcome,
                    ran_at,
                })
                .ok();
        }
        Err(e) => {
            tracing::error!(error = %e, "expiry sweep failed, retrying at next midnight");
        }
    }
}

/// Time from `now` until the start of the next local calendar day.
pub fn until_next_midnight(now: DateTime<Local>) -> Duration {
    let next_midnight = now
        .date_naive()
        .succ_opt()
        .and_then(|tomorrow| tomorrow.and_hms_opt(0, 0, 0))
        .and_then(|midnight| midnight.and_local_timezone(Local).earliest());

    match next_midnight {
        Some(midnight) => (midnight - now).to_std().unwrap_or(DAY),
        None => DAY,
    }
}
