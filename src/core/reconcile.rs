//! Reconciliation loop - Periodically flushes a settings cache to its store.
//!
//! Lifecycle: `NotStarted -> Hydrating -> Running -> Stopped`. Each tick writes a
//! snapshot of the cache taken at tick start, so a mutation made mid-tick is picked
//! up by the next tick at the latest. Failures are isolated per record and retried
//! on the next tick, as are guilds whose hydration failed. Stopping performs one
//! final flush before returning.
//!
//! Flushes and guild removal take the same gate, so a flush that snapshotted a
//! guild cannot write it back after the guild was forgotten.

use crate::{
    core::{
        cache::{GuildId, HydrateReport, SettingsCache},
        settings::GuildSettings,
        store::{SettingsStore, WriteOutcome},
    },
    errors::{Error, Result},
};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{Mutex, oneshot},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tracing::{debug, error, info, instrument, warn};

/// Lifecycle state of a [`Reconciler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Created, waiting for the gateway ready signal
    NotStarted,
    /// Loading joined guilds from the store
    Hydrating,
    /// Ticking
    Running,
    /// Final flush done, no further writes
    Stopped,
}

/// Outcome counts of one flush.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FlushReport {
    /// Records written as new rows
    pub inserted: usize,
    /// Records that already existed and were overwritten
    pub updated: usize,
    /// Records that could not be written this time
    pub failed: usize,
    /// Guilds skipped because their stored record could not be fetched yet
    pub deferred: usize,
}

impl FlushReport {
    /// Total records attempted.
    #[must_use]
    pub const fn attempted(&self) -> usize {
        self.inserted + self.updated + self.failed
    }
}

/// Writes every cached record to the store, isolating per-record failures.
///
/// Unloaded guilds are fetched again first; those still failing are deferred.
pub async fn flush<T: GuildSettings>(
    cache: &SettingsCache<T>,
    store: &dyn SettingsStore,
) -> FlushReport {
    cache.retry_unloaded(store).await;
    let snapshot = cache.snapshot().await;
    let mut report = FlushReport {
        deferred: cache.unloaded().await.len(),
        ..FlushReport::default()
    };

    for (guild_id, record) in snapshot {
        let key = guild_id.to_string();
        let value = match serde_json::to_value(&record) {
            Ok(v) => v,
            Err(e) => {
                error!("Could not encode {}[{guild_id}]: {e}", T::NAMESPACE);
                report.failed += 1;
                continue;
            }
        };

        match store.upsert_or_update(T::NAMESPACE, &key, &value).await {
            Ok(WriteOutcome::Inserted) => report.inserted += 1,
            Ok(WriteOutcome::Updated) => report.updated += 1,
            Err(e) => {
                warn!(
                    "Could not persist {}[{guild_id}], retrying next tick: {e}",
                    T::NAMESPACE
                );
                report.failed += 1;
            }
        }
    }

    report
}

struct Worker {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

struct Inner {
    state: LoopState,
    worker: Option<Worker>,
}

/// Owns a settings cache, its store and the periodic flush task.
pub struct Reconciler<T: GuildSettings> {
    cache: Arc<SettingsCache<T>>,
    store: Arc<dyn SettingsStore>,
    period: Duration,
    inner: Mutex<Inner>,
    flush_gate: Arc<Mutex<()>>,
}

impl<T: GuildSettings> std::fmt::Debug for Reconciler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("namespace", &T::NAMESPACE)
            .field("period", &self.period)
            .finish_non_exhaustive()
    }
}

impl<T: GuildSettings> Reconciler<T> {
    /// Creates a reconciler with an empty cache.
    #[must_use]
    pub fn new(store: Arc<dyn SettingsStore>, period: Duration) -> Self {
        Self {
            cache: Arc::new(SettingsCache::new()),
            store,
            period,
            inner: Mutex::new(Inner {
                state: LoopState::NotStarted,
                worker: None,
            }),
            flush_gate: Arc::new(Mutex::new(())),
        }
    }

    /// The cache command handlers read and mutate.
    #[must_use]
    pub fn cache(&self) -> &SettingsCache<T> {
        &self.cache
    }

    /// Flush period.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> LoopState {
        self.inner.lock().await.state
    }

    /// Hydrates the joined guilds and starts ticking.
    ///
    /// # Errors
    /// Returns [`Error::InvalidState`] unless the loop has never been started.
    #[instrument(skip(self, guild_ids), fields(namespace = T::NAMESPACE))]
    pub async fn start(&self, guild_ids: &[GuildId]) -> Result<HydrateReport> {
        {
            let mut inner = self.inner.lock().await;
            if inner.state != LoopState::NotStarted {
                return Err(Error::InvalidState {
                    message: format!("{} loop cannot start from {:?}", T::NAMESPACE, inner.state),
                });
            }
            inner.state = LoopState::Hydrating;
        }

        let report = self
            .cache
            .hydrate_from_store(self.store.as_ref(), guild_ids)
            .await;

        let mut inner = self.inner.lock().await;
        if inner.state != LoopState::Hydrating {
            // Stopped while hydrating
            return Err(Error::InvalidState {
                message: format!("{} loop was stopped during hydration", T::NAMESPACE),
            });
        }

        let (stop, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(run_ticks(
            Arc::clone(&self.cache),
            Arc::clone(&self.store),
            Arc::clone(&self.flush_gate),
            self.period,
            stop_rx,
        ));
        inner.worker = Some(Worker { stop, handle });
        inner.state = LoopState::Running;

        info!("{} loop running every {:?}", T::NAMESPACE, self.period);
        Ok(report)
    }

    /// Hydrates one newly joined guild.
    pub async fn hydrate_guild(&self, guild_id: GuildId) -> HydrateReport {
        self.cache
            .hydrate_from_store(self.store.as_ref(), &[guild_id])
            .await
    }

    /// Flushes immediately, outside the tick schedule.
    pub async fn flush_now(&self) -> FlushReport {
        let _gate = self.flush_gate.lock().await;
        flush(&self.cache, self.store.as_ref()).await
    }

    /// Drops the guild from the cache and removes its records from every namespace.
    ///
    /// Store failures are logged; the cache entry is removed regardless. Waits for
    /// an in-flight flush to finish so it cannot re-create the row afterwards.
    #[instrument(skip(self), fields(namespace = T::NAMESPACE))]
    pub async fn forget_guild(&self, guild_id: GuildId) {
        let _gate = self.flush_gate.lock().await;
        self.cache.remove(guild_id).await;
        match self.store.delete_all(&guild_id.to_string()).await {
            Ok(removed) => debug!("Removed {removed} stored records for guild {guild_id}"),
            Err(e) => warn!("Could not remove stored records for guild {guild_id}: {e}"),
        }
    }

    /// Stops ticking and performs the final flush.
    ///
    /// Returns `None` if the loop was already stopped.
    #[instrument(skip(self), fields(namespace = T::NAMESPACE))]
    pub async fn stop(&self) -> Option<FlushReport> {
        let mut inner = self.inner.lock().await;
        if inner.state == LoopState::Stopped {
            return None;
        }

        if let Some(worker) = inner.worker.take() {
            // The task may already have exited, in which case the send fails harmlessly.
            let _ = worker.stop.send(());
            if let Err(e) = worker.handle.await {
                error!("{} loop task ended abnormally: {e}", T::NAMESPACE);
            }
        }

        let report = {
            let _gate = self.flush_gate.lock().await;
            flush(&self.cache, self.store.as_ref()).await
        };
        inner.state = LoopState::Stopped;
        info!(
            "{} loop stopped after final flush: {:?}",
            T::NAMESPACE,
            report
        );
        Some(report)
    }
}

async fn run_ticks<T: GuildSettings>(
    cache: Arc<SettingsCache<T>>,
    store: Arc<dyn SettingsStore>,
    flush_gate: Arc<Mutex<()>>,
    period: Duration,
    mut stop: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = ticker.tick() => {
                let report = {
                    let _gate = flush_gate.lock().await;
                    flush(&cache, store.as_ref()).await
                };
                if report.failed > 0 || report.deferred > 0 {
                    warn!("{} tick: {:?}", T::NAMESPACE, report);
                } else {
                    debug!("{} tick: {:?}", T::NAMESPACE, report);
                }
            }
        }
    }
}
