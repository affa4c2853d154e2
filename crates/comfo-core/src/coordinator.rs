// ── Update coordinator ──
//
// Full refresh lifecycle for one ventilation unit. Owns the snapshot
// cache and the debouncer, drives periodic polling, fans change
// notifications out to subscribers, and routes write commands through
// the command-then-refresh pattern.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use comfo_api::{ApiError, BootInfo, ComfoClient, FanMode};

use crate::config::CoordinatorConfig;
use crate::debounce::Debouncer;
use crate::error::CoreError;
use crate::snapshot::{DataGroup, Snapshot};
use crate::store::SnapshotCache;
use crate::stream::{Update, UpdateStream};

/// What one refresh execution resolves to.
pub type RefreshOutcome = Result<Arc<Snapshot>, CoreError>;

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc`; all clones share one cache, one
/// debouncer and one subscriber channel, so every consumer reads the
/// same state without issuing its own network calls. Must be created
/// inside a tokio runtime.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

struct Inner {
    config: CoordinatorConfig,
    engine: Arc<Engine>,
    debouncer: Debouncer<RefreshOutcome>,
    cancel: CancellationToken,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    /// Dropping the last handle tears the background tasks down even
    /// when the embedder never called [`Coordinator::stop`].
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl Coordinator {
    /// Create a coordinator for one unit. Does NOT poll --
    /// call [`start()`](Self::start) for periodic polling, or
    /// [`request_refresh()`](Self::request_refresh) for the initial
    /// on-demand fetch.
    pub fn new(api: Arc<dyn ComfoClient>, config: CoordinatorConfig) -> Self {
        let cancel = CancellationToken::new();
        let (updates, _) = watch::channel(Update::Pending);

        let engine = Arc::new(Engine {
            api,
            cache: SnapshotCache::new(),
            updates,
            cancel: cancel.clone(),
            batch_timeout: config.request_timeout,
        });

        let debouncer = Debouncer::new(config.debounce_cooldown, config.immediate, cancel.clone(), {
            let engine = Arc::clone(&engine);
            move || {
                let engine = Arc::clone(&engine);
                async move { engine.refresh_once().await }
            }
        });

        Self {
            inner: Arc::new(Inner {
                config,
                engine,
                debouncer,
                cancel,
                poll_task: Mutex::new(None),
            }),
        }
    }

    /// Access the coordinator configuration.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Begin periodic polling at the configured interval. Each tick is
    /// routed through the debouncer as fire-and-forget demand, so the
    /// timer can never overlap a just-completed on-demand refresh.
    /// Idempotent; the first poll fires one full interval from now
    /// (do the initial fetch with [`request_refresh()`](Self::request_refresh)).
    pub async fn start(&self) {
        let mut guard = self.inner.poll_task.lock().await;
        if guard.is_some() || self.inner.cancel.is_cancelled() {
            return;
        }
        debug!(
            interval_secs = self.inner.config.poll_interval.as_secs(),
            "starting periodic polling"
        );
        // The task gets its own debouncer handle, not a full clone of
        // this coordinator, so it never keeps `Inner` alive on its own.
        *guard = Some(tokio::spawn(poll_task(
            self.inner.debouncer.clone(),
            self.inner.config.poll_interval,
            self.inner.cancel.clone(),
        )));
    }

    /// Tear the coordinator down: cancel the periodic timer and any
    /// pending debounced demand. An execution already in flight
    /// completes but commits nothing and notifies no one. Idempotent.
    pub async fn stop(&self) {
        self.inner.cancel.cancel();
        if let Some(handle) = self.inner.poll_task.lock().await.take() {
            handle.abort();
            let _ = handle.await;
        }
        debug!("coordinator stopped");
    }

    // ── Refresh ──────────────────────────────────────────────────

    /// Force a near-immediate refresh, coalesced with any concurrent
    /// demand. Resolves once an execution that started at or after this
    /// call completes, with the new snapshot or the classified error.
    pub async fn request_refresh(&self) -> RefreshOutcome {
        match self.inner.debouncer.call().await {
            Some(outcome) => outcome,
            None => Err(CoreError::Stopped),
        }
    }

    // ── State observation ────────────────────────────────────────

    /// Subscribe to refresh outcomes. A subscriber registered after the
    /// first successful refresh synchronously observes the current
    /// snapshot; unsubscribing is dropping the handle. Stopping the
    /// coordinator ends every subscription.
    pub fn subscribe(&self) -> UpdateStream {
        UpdateStream::new(
            self.inner.engine.updates.subscribe(),
            self.inner.cancel.clone(),
        )
    }

    /// Non-blocking read of the latest complete snapshot. `None` until
    /// the first successful refresh.
    pub fn current_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.inner.engine.cache.load()
    }

    /// The most recent refresh outcome (snapshot, failure, or pending).
    pub fn last_update(&self) -> Update {
        self.inner.engine.updates.borrow().clone()
    }

    // ── Unit commands (command-then-refresh) ─────────────────────

    /// Set the comfort (heat-recovery cut-off) temperature. The unit
    /// stores whole degrees, so the value is rounded. Returns whether
    /// the stored value changed.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub async fn set_comfort_temperature(&self, celsius: f32) -> Result<bool, CoreError> {
        if !celsius.is_finite() || !(0.0..=30.0).contains(&celsius) {
            return Err(CoreError::InvalidArgument {
                message: format!("comfort temperature {celsius} is outside 0-30 °C"),
            });
        }
        let whole = celsius.round() as u8;

        debug!(celsius = whole, "setting comfort temperature");
        let changed = self
            .inner
            .engine
            .api
            .set_comfort_temperature(whole)
            .await
            .map_err(CoreError::from)?;
        self.refresh_if_changed("comfort temperature", changed)
            .await?;
        Ok(changed)
    }

    /// Switch the active fan profile. Returns whether the profile
    /// changed on the unit.
    pub async fn set_fan_mode(&self, mode: FanMode) -> Result<bool, CoreError> {
        debug!(%mode, "setting fan profile");
        let changed = self
            .inner
            .engine
            .api
            .set_fan_speed(mode)
            .await
            .map_err(CoreError::from)?;
        self.refresh_if_changed("fan profile", changed).await?;
        Ok(changed)
    }

    /// Reconfigure the duty percentage of one fan profile. Returns
    /// whether the stored percentage changed.
    pub async fn configure_fan_profile(
        &self,
        mode: FanMode,
        percent: u8,
    ) -> Result<bool, CoreError> {
        if percent > 100 {
            return Err(CoreError::InvalidArgument {
                message: format!("fan duty {percent}% is outside 0-100%"),
            });
        }

        debug!(%mode, percent, "configuring fan profile");
        let changed = self
            .inner
            .engine
            .api
            .configure_fan_profile(mode, percent)
            .await
            .map_err(CoreError::from)?;
        self.refresh_if_changed("fan profile duty", changed).await?;
        Ok(changed)
    }

    /// Pull the new state in after a write the unit acknowledged as a
    /// real change. A no-op write skips the round-trip entirely.
    async fn refresh_if_changed(&self, what: &str, changed: bool) -> Result<(), CoreError> {
        if changed {
            debug!(what, "value changed on the unit; refreshing");
            self.request_refresh().await?;
        } else {
            debug!(what, "value unchanged on the unit; skipping refresh");
        }
        Ok(())
    }
}

/// Validate that a unit is reachable and identify it: liveness probe
/// followed by the boot-info read. Intended for setup surfaces that
/// need to check a host before constructing a [`Coordinator`].
pub async fn verify_device(api: &dyn ComfoClient) -> Result<BootInfo, CoreError> {
    api.ping().await.map_err(CoreError::from)?;
    let boot_info = api.boot_info().await.map_err(CoreError::from)?;
    debug!(device = %boot_info.device_name, serial = %boot_info.serial_number, "device verified");
    Ok(boot_info)
}

// ── Background tasks ─────────────────────────────────────────────

/// Route one fire-and-forget refresh demand per interval tick through
/// the debouncer.
async fn poll_task(
    debouncer: Debouncer<RefreshOutcome>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(interval);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => debouncer.request(),
        }
    }
}

// ── Refresh execution ────────────────────────────────────────────

/// The state one refresh execution touches. Split out of `Inner` so the
/// debouncer's worker closure can own it without a reference cycle.
struct Engine {
    api: Arc<dyn ComfoClient>,
    cache: SnapshotCache,
    updates: watch::Sender<Update>,
    cancel: CancellationToken,
    batch_timeout: Duration,
}

impl Engine {
    /// One serialized refresh execution: fetch all six groups, then
    /// commit-and-notify or report the classified failure. Invoked only
    /// by the debouncer worker, never concurrently with itself.
    async fn refresh_once(&self) -> RefreshOutcome {
        let outcome = self.fetch_all().await;

        if self.cancel.is_cancelled() {
            // Torn down while fetching: commit nothing, notify no one.
            return Err(CoreError::Stopped);
        }

        match outcome {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.cache.replace(Arc::clone(&snapshot));
                self.updates
                    .send_replace(Update::Snapshot(Arc::clone(&snapshot)));
                debug!(device = %snapshot.boot_info.device_name, "refresh complete");
                Ok(snapshot)
            }
            Err(err) => {
                // Previous snapshot stays authoritative; subscribers
                // decide whether to surface staleness.
                warn!(error = %err, "refresh failed; keeping previous snapshot");
                self.updates.send_replace(Update::Failed(err.clone()));
                Err(err)
            }
        }
    }

    /// Fetch every data group concurrently under one shared budget. Any
    /// single failure fails the whole batch -- no stale field ever rides
    /// into an otherwise-fresh snapshot.
    async fn fetch_all(&self) -> Result<Snapshot, CoreError> {
        let fetch = async {
            tokio::try_join!(
                fetch_group(DataGroup::BootInfo, self.api.boot_info()),
                fetch_group(DataGroup::Errors, self.api.errors()),
                fetch_group(DataGroup::Fans, self.api.fans()),
                fetch_group(DataGroup::FanProfiles, self.api.fan_profiles()),
                fetch_group(DataGroup::Temperatures, self.api.temperatures()),
                fetch_group(DataGroup::Bypass, self.api.bypass()),
            )
        };

        match tokio::time::timeout(self.batch_timeout, fetch).await {
            Err(_elapsed) => Err(CoreError::Timeout {
                reason: format!(
                    "refresh batch exceeded its {}s budget",
                    self.batch_timeout.as_secs()
                ),
            }),
            Ok(Err((group, err))) => {
                warn!(%group, error = %err, "data group fetch failed");
                Err(CoreError::from(err))
            }
            Ok(Ok((boot_info, errors, fans, fan_profiles, temperatures, bypass))) => Ok(Snapshot {
                boot_info,
                errors,
                fans,
                fan_profiles,
                temperatures,
                bypass,
            }),
        }
    }
}

/// Tag a group fetch with its [`DataGroup`] so a batch failure can name
/// the group that sank it.
async fn fetch_group<T>(
    group: DataGroup,
    fut: impl Future<Output = Result<T, ApiError>>,
) -> Result<T, (DataGroup, ApiError)> {
    match fut.await {
        Ok(value) => Ok(value),
        Err(err) => Err((group, err)),
    }
}
