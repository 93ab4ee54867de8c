//! The polling data cache.
//!
//! One [`FeedCache`] per feed.  It answers three questions:
//!
//! * *What is the current value?*  [`FeedCache::get`] returns immediately
//!   with whatever is cached, or [`CachedValue::NotYetAvailable`].
//! * *Is it worth asking the network?*  [`FeedCache::refresh`] skips the
//!   request while the cached value is younger than the feed's freshness
//!   window, unless forced.
//! * *Is someone already asking?*  Only one request per feed is ever in
//!   flight.  Later callers join it and receive the same result.
//!
//! ## Failure and ordering rules
//!
//! A failed fetch never removes the cached value.  The error is stored next
//! to it and reported by `get` until the next successful fetch
//! ("degrade to last-known-good").
//!
//! Every fetch is numbered when it is issued.  A completion is only applied
//! if no later-issued fetch has already been applied, so an old response can
//! never overwrite a newer one.
//!
//! ## Concurrency
//!
//! Each fetch runs on its own spawned task that applies the result and
//! clears the in-flight token in one critical section.  Callers awaiting
//! [`FeedCache::refresh`] can be dropped, and the auto-refresh timer can be
//! stopped, without cancelling the request.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::poll::AutoRefresh;
use crate::source::{DataSource, FeedDescriptor, FeedId, FeedPayload};

/// Outcome of one fetch: a shared decoded record or the reason it failed.
pub type FetchResult<T> = Result<Arc<T>, FetchError>;

type Pending<T> = Shared<BoxFuture<'static, FetchResult<T>>>;

// ---------------------------------------------------------------------------
// Change notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedChange {
    /// A new value was stored.
    Updated,
    /// A fetch failed; the previous value (if any) is still served.
    Failed(FetchError),
}

/// Published whenever a fetch result is applied to a feed's cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEvent {
    pub feed: FeedId,
    pub change: FeedChange,
}

// ---------------------------------------------------------------------------
// Snapshot returned by `get`
// ---------------------------------------------------------------------------

/// A point-in-time view of one feed's cache entry.
#[derive(Debug)]
pub enum CachedValue<T> {
    /// Nothing has been fetched successfully yet.
    NotYetAvailable {
        in_flight: bool,
        error: Option<FetchError>,
    },
    /// The last successfully decoded value.
    ///
    /// `error` is set when the most recent fetch failed, in which case
    /// `value` and `fetched_at` still describe the older success.
    Ready {
        value: Arc<T>,
        fetched_at: DateTime<Utc>,
        in_flight: bool,
        error: Option<FetchError>,
    },
}

impl<T> CachedValue<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            CachedValue::Ready { value, .. } => Some(value.as_ref()),
            CachedValue::NotYetAvailable { .. } => None,
        }
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        match self {
            CachedValue::Ready { fetched_at, .. } => Some(*fetched_at),
            CachedValue::NotYetAvailable { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            CachedValue::Ready { error, .. } | CachedValue::NotYetAvailable { error, .. } => {
                error.as_ref()
            }
        }
    }

    pub fn in_flight(&self) -> bool {
        match self {
            CachedValue::Ready { in_flight, .. } | CachedValue::NotYetAvailable { in_flight, .. } => {
                *in_flight
            }
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, CachedValue::Ready { .. })
    }
}

// ---------------------------------------------------------------------------
// Entry state
// ---------------------------------------------------------------------------

struct Stored<T> {
    value: Arc<T>,
    fetched_at: DateTime<Utc>,
    /// Monotonic twin of `fetched_at`, used for the freshness check.
    fetched: Instant,
}

struct Entry<T> {
    stored: Option<Stored<T>>,
    error: Option<FetchError>,
    /// Single-flight token: sequence number and the shared result future.
    in_flight: Option<(u64, Pending<T>)>,
    /// Sequence number of the last fetch issued.
    issued: u64,
    /// Sequence number of the last fetch whose result was applied.
    applied: u64,
}

impl<T> Entry<T> {
    fn new() -> Self {
        Self {
            stored: None,
            error: None,
            in_flight: None,
            issued: 0,
            applied: 0,
        }
    }

    fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// The cached value, if it is younger than `window` at `now`.
    fn fresh(&self, window: Duration, now: Instant) -> Option<Arc<T>> {
        self.stored
            .as_ref()
            .filter(|s| now.saturating_duration_since(s.fetched) < window)
            .map(|s| Arc::clone(&s.value))
    }

    /// Record the result of fetch `seq`.  Returns `false` (and changes
    /// nothing) if a later fetch has already been applied.
    fn apply(&mut self, seq: u64, result: &FetchResult<T>, wall: DateTime<Utc>, now: Instant) -> bool {
        if seq <= self.applied {
            return false;
        }
        self.applied = seq;
        match result {
            Ok(value) => {
                self.stored = Some(Stored {
                    value: Arc::clone(value),
                    fetched_at: wall,
                    fetched: now,
                });
                self.error = None;
            }
            Err(e) => self.error = Some(e.clone()),
        }
        true
    }

    fn snapshot(&self) -> CachedValue<T> {
        let in_flight = self.in_flight.is_some();
        let error = self.error.clone();
        match &self.stored {
            Some(s) => CachedValue::Ready {
                value: Arc::clone(&s.value),
                fetched_at: s.fetched_at,
                in_flight,
                error,
            },
            None => CachedValue::NotYetAvailable { in_flight, error },
        }
    }
}

// ---------------------------------------------------------------------------
// FeedCache
// ---------------------------------------------------------------------------

/// Cache entry, fetcher and refresh timer for one feed.
///
/// Cheap to clone; clones share the same entry.
pub struct FeedCache<T> {
    descriptor: Arc<FeedDescriptor>,
    source: Arc<dyn DataSource>,
    entry: Arc<Mutex<Entry<T>>>,
    auto: Arc<AutoRefresh>,
    events: broadcast::Sender<FeedEvent>,
}

impl<T> Clone for FeedCache<T> {
    fn clone(&self) -> Self {
        Self {
            descriptor: Arc::clone(&self.descriptor),
            source: Arc::clone(&self.source),
            entry: Arc::clone(&self.entry),
            auto: Arc::clone(&self.auto),
            events: self.events.clone(),
        }
    }
}

impl<T: FeedPayload> FeedCache<T> {
    /// Build an empty cache.  Results are announced on `events`.
    pub fn new(
        descriptor: FeedDescriptor,
        source: Arc<dyn DataSource>,
        events: broadcast::Sender<FeedEvent>,
    ) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            source,
            entry: Arc::new(Mutex::new(Entry::new())),
            auto: Arc::new(AutoRefresh::new()),
            events,
        }
    }

    pub fn descriptor(&self) -> &FeedDescriptor {
        &self.descriptor
    }

    pub fn id(&self) -> FeedId {
        self.descriptor.id
    }

    /// Current state of the cache entry.  Never waits on the network.
    pub fn get(&self) -> CachedValue<T> {
        self.entry.lock().snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.events.subscribe()
    }

    /// Bring the cached value up to date.
    ///
    /// Without `force`, a value younger than the freshness window is
    /// returned as-is.  Otherwise the in-flight fetch is joined, or a new one
    /// is started if there is none.
    pub async fn refresh(&self, force: bool) -> FetchResult<T> {
        let pending = {
            let mut entry = self.entry.lock();
            if !force {
                if let Some(value) = entry.fresh(self.descriptor.freshness_window, Instant::now()) {
                    debug!(feed = %self.id(), "served from cache");
                    return Ok(value);
                }
            }
            let joined = entry.in_flight.as_ref().map(|(seq, pending)| {
                debug!(feed = %self.id(), seq, "joining in-flight fetch");
                pending.clone()
            });
            match joined {
                Some(pending) => pending,
                None => self.launch(&mut entry),
            }
        };
        pending.await
    }

    /// Schedule `refresh(true)` every refresh interval, starting now.
    ///
    /// Returns `false` if auto refresh was already running.
    pub fn start_auto_refresh(&self) -> bool {
        let every = self.descriptor.refresh_interval;
        let cache = self.clone();
        let started = self.auto.start(every, move || {
            let cache = cache.clone();
            async move {
                // complete() has already logged and published the outcome.
                let _ = cache.refresh(true).await;
            }
        });
        if started {
            info!(feed = %self.id(), ?every, "auto refresh started");
        }
        started
    }

    /// Cancel the refresh timer.  A fetch already in flight still lands.
    ///
    /// Returns `false` if auto refresh was not running.
    pub fn stop_auto_refresh(&self) -> bool {
        let stopped = self.auto.stop();
        if stopped {
            info!(feed = %self.id(), "auto refresh stopped");
        }
        stopped
    }

    pub fn is_auto_refreshing(&self) -> bool {
        self.auto.is_running()
    }

    /// Issue fetch number `seq` and install its single-flight token.
    /// Called with the entry lock held.
    fn launch(&self, entry: &mut Entry<T>) -> Pending<T> {
        let seq = entry.issue();
        let url = self.descriptor.url();
        debug!(feed = %self.id(), seq, source = self.source.name(), %url, "fetch issued");

        let cache = self.clone();
        let task = tokio::spawn(async move {
            let result = cache
                .source
                .get(&url)
                .await
                .and_then(|body| T::decode(&body))
                .map(Arc::new);
            cache.complete(seq, result)
        });

        let cache = self.clone();
        let pending = async move {
            match task.await {
                Ok(result) => result,
                Err(e) => cache.complete(
                    seq,
                    Err(FetchError::NetworkUnreachable(format!("fetch task failed: {e}"))),
                ),
            }
        }
        .boxed()
        .shared();

        entry.in_flight = Some((seq, pending.clone()));
        pending
    }

    /// Apply the result of fetch `seq`, release the token and notify.
    fn complete(&self, seq: u64, result: FetchResult<T>) -> FetchResult<T> {
        let feed = self.id();
        let applied = {
            let mut entry = self.entry.lock();
            if entry.in_flight.as_ref().is_some_and(|(s, _)| *s == seq) {
                entry.in_flight = None;
            }
            entry.apply(seq, &result, Utc::now(), Instant::now())
        };

        if !applied {
            debug!(feed = %feed, seq, "discarding completion older than cached value");
            return result;
        }

        let change = match &result {
            Ok(_) => {
                info!(feed = %feed, seq, "feed updated");
                FeedChange::Updated
            }
            Err(e) => {
                warn!(feed = %feed, seq, kind = e.kind(), error = %e, "fetch failed, keeping last known value");
                FeedChange::Failed(e.clone())
            }
        };
        // Nobody listening is fine.
        let _ = self.events.send(FeedEvent { feed, change });
        result
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
