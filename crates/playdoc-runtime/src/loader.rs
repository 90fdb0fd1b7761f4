//! Lazy, deduplicated acquisition of a heavyweight runtime
//!
//! A [`RuntimeLoader`] owns the lifecycle of one expensive runtime: nothing is
//! loaded until the first [`RuntimeLoader::ensure_ready`] call, every caller
//! that arrives while the load is running subscribes to the same completion
//! signal, and later callers get the cached handle straight away.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::sync::watch;

use crate::{Error, Result};

/// Lifecycle of a runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuntimeState {
    Unloaded,
    Loading,
    Ready,
}

/// The external asset a loader initializes.
pub trait RuntimeAsset: Send + Sync + 'static {
    /// The initialized runtime handed to callers
    type Runtime: Send + Sync + 'static;

    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Fetch and initialize the runtime.
    fn load(&self) -> Pin<Box<dyn Future<Output = Result<Self::Runtime>> + Send + '_>>;
}

/// Outcome broadcast to everyone waiting on a load
enum LoadStatus<R> {
    Pending,
    Ready(Arc<R>),
    Failed(String),
}

enum Slot<R> {
    Unloaded,
    Loading(watch::Receiver<LoadStatus<R>>),
    Ready(Arc<R>),
}

/// Loads a runtime at most once per successful attempt.
///
/// A failed load rejects every caller waiting on it with
/// [`Error::RuntimeUnavailable`] and returns the loader to
/// [`RuntimeState::Unloaded`], so a later call may retry.
pub struct RuntimeLoader<A: RuntimeAsset> {
    asset: Arc<A>,
    slot: Arc<Mutex<Slot<A::Runtime>>>,
}

impl<A: RuntimeAsset> RuntimeLoader<A> {
    pub fn new(asset: A) -> Self {
        Self {
            asset: Arc::new(asset),
            slot: Arc::new(Mutex::new(Slot::Unloaded)),
        }
    }

    pub fn asset(&self) -> &A {
        &self.asset
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RuntimeState {
        match &*lock(&self.slot) {
            Slot::Unloaded => RuntimeState::Unloaded,
            Slot::Loading(_) => RuntimeState::Loading,
            Slot::Ready(_) => RuntimeState::Ready,
        }
    }

    /// The cached runtime, if it has finished loading.
    pub fn handle(&self) -> Option<Arc<A::Runtime>> {
        match &*lock(&self.slot) {
            Slot::Ready(runtime) => Some(runtime.clone()),
            _ => None,
        }
    }

    /// Wait until the runtime is ready, starting the load if nobody has.
    pub async fn ensure_ready(&self) -> Result<Arc<A::Runtime>> {
        let mut rx = {
            let mut slot = lock(&self.slot);
            match &*slot {
                Slot::Ready(runtime) => return Ok(runtime.clone()),
                Slot::Loading(rx) => rx.clone(),
                Slot::Unloaded => {
                    let (tx, rx) = watch::channel(LoadStatus::Pending);
                    *slot = Slot::Loading(rx.clone());
                    self.spawn_load(tx);
                    rx
                }
            }
        };

        let status = rx
            .wait_for(|status| !matches!(status, LoadStatus::Pending))
            .await
            .map_err(|_| Error::RuntimeUnavailable("load task ended unexpectedly".to_string()))?;

        match &*status {
            LoadStatus::Ready(runtime) => Ok(runtime.clone()),
            LoadStatus::Failed(message) => Err(Error::RuntimeUnavailable(message.clone())),
            LoadStatus::Pending => Err(Error::RuntimeUnavailable(
                "load still pending".to_string(),
            )),
        }
    }

    /// Drop a broken runtime so the next [`ensure_ready`](Self::ensure_ready)
    /// starts a fresh load.
    ///
    /// Only takes effect while `runtime` is still the cached handle; returns
    /// whether it did.
    pub fn invalidate(&self, runtime: &Arc<A::Runtime>) -> bool {
        let mut slot = lock(&self.slot);
        match &*slot {
            Slot::Ready(current) if Arc::ptr_eq(current, runtime) => {
                *slot = Slot::Unloaded;
                tracing::warn!(runtime = self.asset.name(), "Runtime invalidated");
                true
            }
            _ => false,
        }
    }

    /// Run the load on its own task, so a caller that stops waiting does not
    /// abandon the others.
    fn spawn_load(&self, tx: watch::Sender<LoadStatus<A::Runtime>>) {
        let asset = self.asset.clone();
        let slot = self.slot.clone();

        tracing::info!(runtime = asset.name(), "Runtime loading");

        tokio::spawn(async move {
            let start = Instant::now();
            let status = match asset.load().await {
                Ok(runtime) => {
                    let runtime = Arc::new(runtime);
                    *lock(&slot) = Slot::Ready(runtime.clone());
                    tracing::info!(
                        runtime = asset.name(),
                        elapsed_ms = start.elapsed().as_millis(),
                        "Runtime ready"
                    );
                    LoadStatus::Ready(runtime)
                }
                Err(e) => {
                    *lock(&slot) = Slot::Unloaded;
                    tracing::error!(
                        runtime = asset.name(),
                        elapsed_ms = start.elapsed().as_millis(),
                        error = %e,
                        "Runtime failed to load"
                    );
                    LoadStatus::Failed(e.to_string())
                }
            };
            // Nobody listening is fine: the slot already holds the outcome
            let _ = tx.send(status);
        });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
