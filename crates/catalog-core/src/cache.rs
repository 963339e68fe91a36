// ── Shared reference-data cache ──
//
// One cache per kind of rarely-changing data (categories). The first
// subscriber triggers a fetch; subscribers arriving while it is in flight
// attach to the same cycle instead of fetching again. Transient failures
// refetch on a fixed timer, a 404 is final for the life of the cache.
//
// Only the triggering subscriber hears about every attempt. Others hear
// once, when the cycle settles (success or 404), so a subscriber mounted
// before the first response misses intermediate transient errors.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use catalog_api::{ErrorKind, Handlers, Outcome, PendingOperation};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CoreError;

type FetchFn<T> = dyn Fn(Handlers<T>) -> PendingOperation + Send + Sync;

// ── State ────────────────────────────────────────────────────────────

enum CacheEntry<T> {
    Empty,
    InFlight,
    Loaded(Arc<T>),
    Error { message: String, kind: ErrorKind },
}

/// Data-free view of the cache's state machine, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    InFlight,
    Loaded,
    /// `recoverable` is false after a 404: no further fetch will happen.
    Error { recoverable: bool },
}

/// What a subscriber sees.
///
/// `data` is `T::default()` until the first successful fetch.
#[derive(Debug)]
pub struct Snapshot<T> {
    pub data: Arc<T>,
    pub has_loaded: bool,
    pub error_message: Option<String>,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            has_loaded: self.has_loaded,
            error_message: self.error_message.clone(),
        }
    }
}

struct Slot<T> {
    entry: CacheEntry<T>,
    /// Survives a refetch after a transient error; cleared on success.
    error_message: Option<String>,
    /// Flips to `true` once the current cycle succeeds or hits a 404.
    cycle: Option<watch::Receiver<bool>>,
    lifecycle: CancellationToken,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            entry: CacheEntry::Empty,
            error_message: None,
            cycle: None,
            lifecycle: CancellationToken::new(),
        }
    }

    fn snapshot(&self, empty: &Arc<T>) -> Snapshot<T> {
        let (data, has_loaded) = match &self.entry {
            CacheEntry::Loaded(data) => (Arc::clone(data), true),
            _ => (Arc::clone(empty), false),
        };
        Snapshot {
            data,
            has_loaded,
            error_message: self.error_message.clone(),
        }
    }

    fn state(&self) -> CacheState {
        match &self.entry {
            CacheEntry::Empty => CacheState::Empty,
            CacheEntry::InFlight => CacheState::InFlight,
            CacheEntry::Loaded(_) => CacheState::Loaded,
            CacheEntry::Error { kind, .. } => CacheState::Error {
                recoverable: *kind != ErrorKind::NotFound,
            },
        }
    }

    fn settled_result(&self) -> Option<Result<Arc<T>, CoreError>> {
        match &self.entry {
            CacheEntry::Loaded(data) => Some(Ok(Arc::clone(data))),
            CacheEntry::Error { message, kind } => {
                Some(Err(CoreError::from_kind(*kind, message.clone(), None)))
            }
            CacheEntry::Empty | CacheEntry::InFlight => None,
        }
    }
}

// ── Subscribers ──────────────────────────────────────────────────────

struct Observer<T> {
    mounted: AtomicBool,
    tx: watch::Sender<Snapshot<T>>,
}

impl<T> Observer<T> {
    fn notify(observer: &Weak<Self>, snapshot: Snapshot<T>) {
        let Some(observer) = observer.upgrade() else {
            return;
        };
        if observer.mounted.load(Ordering::Acquire) {
            observer.tx.send_replace(snapshot);
        }
    }
}

/// A live observer of a [`SharedReferenceCache`].
///
/// The cache only holds it weakly. Dropping it (or calling
/// [`unsubscribe`](Self::unsubscribe)) stops further updates; any fetch
/// already running still populates the cache.
pub struct Subscription<T> {
    observer: Arc<Observer<T>>,
    receiver: watch::Receiver<Snapshot<T>>,
}

impl<T> Subscription<T> {
    /// The latest state delivered to this subscriber.
    pub fn snapshot(&self) -> Snapshot<T> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next update. `None` once unsubscribed.
    pub async fn changed(&mut self) -> Option<Snapshot<T>> {
        if !self.is_mounted() {
            return None;
        }
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    pub fn unsubscribe(&self) {
        self.observer.mounted.store(false, Ordering::Release);
    }

    pub fn is_mounted(&self) -> bool {
        self.observer.mounted.load(Ordering::Acquire)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

// ── SharedReferenceCache ─────────────────────────────────────────────

/// Single-flight cache for reference data.
///
/// Cheaply cloneable; clones share state. Construct one per data kind and
/// pass it to consumers. [`reset`](Self::reset) returns it to `Empty`.
pub struct SharedReferenceCache<T> {
    inner: Arc<CacheInner<T>>,
}

impl<T> Clone for SharedReferenceCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CacheInner<T> {
    label: String,
    retry_delay: Duration,
    fetch: Box<FetchFn<T>>,
    empty: Arc<T>,
    slot: Mutex<Slot<T>>,
}

impl<T> CacheInner<T> {
    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> Snapshot<T> {
        self.lock().snapshot(&self.empty)
    }
}

impl<T: Default + Send + Sync + 'static> SharedReferenceCache<T> {
    /// `fetch` starts one request and reports through the handlers it is given.
    pub fn new(
        label: impl Into<String>,
        retry_delay: Duration,
        fetch: impl Fn(Handlers<T>) -> PendingOperation + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                label: label.into(),
                retry_delay,
                fetch: Box::new(fetch),
                empty: Arc::new(T::default()),
                slot: Mutex::new(Slot::new()),
            }),
        }
    }

    /// Start observing the cache, fetching if nobody has yet.
    ///
    /// Must be called within a Tokio runtime.
    pub fn subscribe(&self) -> Subscription<T> {
        let mut slot = self.inner.lock();
        let (tx, receiver) = watch::channel(slot.snapshot(&self.inner.empty));
        let observer = Arc::new(Observer {
            mounted: AtomicBool::new(true),
            tx,
        });

        if !matches!(slot.entry, CacheEntry::Loaded(_)) {
            if let Some(cycle) = slot.cycle.clone() {
                debug!(cache = %self.inner.label, "attaching to in-flight fetch");
                tokio::spawn(attach(
                    Arc::downgrade(&self.inner),
                    slot.lifecycle.clone(),
                    cycle,
                    Arc::downgrade(&observer),
                ));
            } else {
                let (settled_tx, settled_rx) = watch::channel(false);
                slot.entry = CacheEntry::InFlight;
                slot.cycle = Some(settled_rx);
                info!(cache = %self.inner.label, "fetching reference data");
                tokio::spawn(fetch_cycle(
                    Arc::downgrade(&self.inner),
                    slot.lifecycle.clone(),
                    settled_tx,
                    Arc::downgrade(&observer),
                ));
            }
        }

        Subscription { observer, receiver }
    }

    /// Current shared state, without subscribing or fetching.
    pub fn snapshot(&self) -> Snapshot<T> {
        self.inner.snapshot()
    }

    pub fn state(&self) -> CacheState {
        self.inner.lock().state()
    }

    /// Forget everything and stop any running fetch or retry timer.
    ///
    /// Existing subscriptions stop receiving updates.
    pub fn reset(&self) {
        let mut slot = self.inner.lock();
        slot.lifecycle.cancel();
        *slot = Slot::new();
        debug!(cache = %self.inner.label, "cache reset");
    }

    /// Subscribe and wait for data or an error.
    ///
    /// Returns at once if the cache already holds either. A wait that began
    /// behind another subscriber's fetch only ends on success or a 404.
    /// A fetch that ends without any outcome yields [`CoreError::Cancelled`].
    pub async fn load(&self) -> Result<Arc<T>, CoreError> {
        let lifecycle = self.inner.lock().lifecycle.clone();

        loop {
            let mut subscription = self.subscribe();
            let settled = self.inner.lock().settled_result();
            if let Some(result) = settled {
                return result;
            }
            tokio::select! {
                biased;
                () = lifecycle.cancelled() => return Err(CoreError::Cancelled),
                update = subscription.changed() => {
                    if update.is_none() {
                        return Err(CoreError::Cancelled);
                    }
                }
            }

            let slot = self.inner.lock();
            if let Some(result) = slot.settled_result() {
                return result;
            }
            if matches!(slot.entry, CacheEntry::Empty) {
                return Err(CoreError::Cancelled);
            }
            // Another cycle started since the update; follow that one.
        }
    }
}

// ── Background tasks ─────────────────────────────────────────────────

async fn wait_settled(mut cycle: watch::Receiver<bool>) -> bool {
    cycle.wait_for(|done| *done).await.is_ok()
}

/// Deliver the settled (or abandoned) state of a cycle to a late subscriber.
async fn attach<T>(
    inner: Weak<CacheInner<T>>,
    lifecycle: CancellationToken,
    cycle: watch::Receiver<bool>,
    observer: Weak<Observer<T>>,
) {
    if !wait_settled(cycle).await {
        debug!("fetch cycle ended without settling");
    }
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let snapshot = {
        let slot = inner.lock();
        // Subscriptions from before a reset get nothing more.
        if lifecycle.is_cancelled() {
            return;
        }
        slot.snapshot(&inner.empty)
    };
    Observer::notify(&observer, snapshot);
}

/// Fetch until success or a 404, reporting each attempt to `trigger`.
#[allow(clippy::too_many_lines)]
async fn fetch_cycle<T: Send + Sync + 'static>(
    inner: Weak<CacheInner<T>>,
    lifecycle: CancellationToken,
    settled: watch::Sender<bool>,
    trigger: Weak<Observer<T>>,
) {
    loop {
        let Some(cache) = inner.upgrade() else {
            return;
        };
        let label = cache.label.clone();
        let retry_delay = cache.retry_delay;
        let (handlers, outcome) = Handlers::channel();
        let op = (cache.fetch)(handlers);
        drop(cache);

        let outcome = tokio::select! {
            biased;
            () = lifecycle.cancelled() => {
                op.cancel();
                return;
            }
            outcome = outcome => outcome,
        };
        let Some(cache) = inner.upgrade() else {
            return;
        };

        let Ok(outcome) = outcome else {
            // Back to Empty so the next subscriber fetches again. Dropping
            // `settled` releases attached subscribers.
            warn!(cache = %label, "fetch ended without an outcome");
            let snapshot = {
                let mut slot = cache.lock();
                if lifecycle.is_cancelled() {
                    return;
                }
                slot.entry = CacheEntry::Empty;
                slot.cycle = None;
                slot.snapshot(&cache.empty)
            };
            drop(cache);
            drop(settled);
            Observer::notify(&trigger, snapshot);
            return;
        };

        match outcome {
            Outcome::Success(data) => {
                let snapshot = {
                    let mut slot = cache.lock();
                    if lifecycle.is_cancelled() {
                        return;
                    }
                    slot.entry = CacheEntry::Loaded(Arc::new(data));
                    slot.error_message = None;
                    slot.snapshot(&cache.empty)
                };
                info!(cache = %label, "reference data loaded");
                settled.send_replace(true);
                Observer::notify(&trigger, snapshot);
                return;
            }
            Outcome::Failure { ui_message, cause } => {
                let kind = cause.kind();
                let snapshot = {
                    let mut slot = cache.lock();
                    if lifecycle.is_cancelled() {
                        return;
                    }
                    slot.entry = CacheEntry::Error {
                        message: ui_message.clone(),
                        kind,
                    };
                    slot.error_message = Some(ui_message);
                    slot.snapshot(&cache.empty)
                };
                drop(cache);
                Observer::notify(&trigger, snapshot);

                if kind == ErrorKind::NotFound {
                    warn!(cache = %label, error = %cause, "reference data does not exist");
                    settled.send_replace(true);
                    return;
                }
                warn!(
                    cache = %label,
                    error = %cause,
                    retry_in_ms = u64::try_from(retry_delay.as_millis()).unwrap_or(u64::MAX),
                    "fetch failed, retrying"
                );
            }
        }

        tokio::select! {
            biased;
            () = lifecycle.cancelled() => return,
            () = tokio::time::sleep(retry_delay) => {}
        }

        let Some(cache) = inner.upgrade() else {
            return;
        };
        let mut slot = cache.lock();
        if lifecycle.is_cancelled() {
            return;
        }
        slot.entry = CacheEntry::InFlight;
        debug!(cache = %label, "refetching reference data");
    }
}
