//! Relation cache and fetch coordinator
//!
//! Owns a single slot for the current pivot. Every transition of that slot
//! happens under one lock and is broadcast while the lock is held, so
//! subscribers see transitions in the order they happened:
//!
//! - a cycle publishes `Pending` first and at most one terminal state
//! - a superseded cycle is cancelled before the new `Pending` is published,
//!   and its result is dropped because its cycle id is no longer current
//! - a new fetch does not start until the previous cycle's task has exited,
//!   so at most one fetch runs per coordinator

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::classify::{classify, RelatedEntry};
use crate::collection::ActiveCollection;
use crate::config::RelationsConfig;
use crate::domain::Entry;
use crate::error::{FetchError, RelationError, Result};
use crate::fetch::{RelationFetcher, RelationKind};
use crate::identity::{resolve, Doi};
use crate::state::{FetchResult, RelationState};

/// Shared, immutable payload of a successful fetch
pub type RelatedEntries = Arc<Vec<Entry>>;

/// Snapshot delivered to subscribers on every transition
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    /// Cycle the transition belongs to (0 before any cycle has started)
    pub cycle: u64,
    pub state: RelationState<RelatedEntries>,
}

/// What a call to `load_entries` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Started { cycle: u64 },
    AlreadyLoading,
    AlreadyLoaded,
}

struct Cycle {
    id: u64,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

struct Slot {
    pivot: Option<Doi>,
    state: RelationState<RelatedEntries>,
    cycle: Option<Cycle>,
    /// Task of a cancelled cycle that may still be winding down
    draining: Option<JoinHandle<()>>,
    last_cycle: u64,
}

struct Shared {
    slot: Mutex<Slot>,
    events: broadcast::Sender<StateChange>,
    fetch_count: AtomicUsize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Must be called with the slot lock held
    fn publish(&self, cycle: u64, state: RelationState<RelatedEntries>) {
        // No subscribers is fine
        let _ = self.events.send(StateChange { cycle, state });
    }

    fn complete(
        &self,
        id: u64,
        kind: RelationKind,
        result: std::result::Result<Vec<Entry>, FetchError>,
    ) {
        let mut slot = self.lock();

        if slot.cycle.as_ref().map(|c| c.id) != Some(id) {
            tracing::debug!("Dropping result of superseded cycle {}", id);
            return;
        }

        let state = match result {
            Err(error) if error.is_cancelled() => {
                tracing::debug!("Cycle {} cancelled by its fetcher", id);
                RelationState::Cancelled
            }
            result => {
                let fetched = FetchResult::from(result.map(Arc::new));
                debug_assert!(slot
                    .state
                    .as_result()
                    .is_some_and(|current| current.can_transition_to(&fetched)));

                match &fetched {
                    FetchResult::Success(entries) => tracing::info!(
                        "Found {} {} for {}",
                        entries.len(),
                        kind.path(),
                        display_pivot(&slot.pivot)
                    ),
                    FetchResult::Failure(error) => tracing::error!(
                        "Error while fetching {} for {}: {}",
                        kind.path(),
                        display_pivot(&slot.pivot),
                        error
                    ),
                    FetchResult::Pending => {}
                }
                RelationState::Loaded(fetched)
            }
        };

        slot.state = state.clone();
        self.publish(id, state);
    }
}

fn display_pivot(pivot: &Option<Doi>) -> &str {
    pivot.as_ref().map(Doi::as_str).unwrap_or("<no DOI>")
}

/// Coordinates relation fetches for one pivot entry at a time
pub struct RelationCoordinator {
    kind: RelationKind,
    fetcher: Arc<dyn RelationFetcher>,
    fetch_timeout: Option<Duration>,
    shared: Arc<Shared>,
}

impl RelationCoordinator {
    pub fn new(
        pivot: &Entry,
        kind: RelationKind,
        fetcher: Arc<dyn RelationFetcher>,
        config: &RelationsConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.channel_capacity.max(1) as usize);

        Self {
            kind,
            fetcher,
            fetch_timeout: config.fetch_timeout_secs.map(Duration::from_secs),
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot {
                    pivot: resolve(pivot),
                    state: RelationState::NotLoaded,
                    cycle: None,
                    draining: None,
                    last_cycle: 0,
                }),
                events,
                fetch_count: AtomicUsize::new(0),
            }),
        }
    }

    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    /// The current pivot's DOI, if it has one
    pub fn pivot_doi(&self) -> Option<Doi> {
        self.shared.lock().pivot.clone()
    }

    /// Whether the current pivot can be looked up at all
    pub fn can_fetch(&self) -> bool {
        self.shared.lock().pivot.is_some()
    }

    /// Current state snapshot
    pub fn state(&self) -> RelationState<RelatedEntries> {
        self.shared.lock().state.clone()
    }

    /// Receive every subsequent state change, in order.
    ///
    /// A receiver that falls more than `channel_capacity` changes behind gets
    /// `RecvError::Lagged` and should re-read `state()`.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.shared.events.subscribe()
    }

    /// Number of fetches actually started (diagnostics)
    pub fn fetch_count(&self) -> usize {
        self.shared.fetch_count.load(Ordering::SeqCst)
    }

    /// Classify the loaded entries against `collection`.
    ///
    /// `None` unless the current cycle succeeded.
    pub fn classified<C>(&self, collection: &C) -> Option<Vec<RelatedEntry>>
    where
        C: ActiveCollection + ?Sized,
    {
        match self.state() {
            RelationState::Loaded(FetchResult::Success(entries)) => {
                Some(classify(&entries, collection))
            }
            RelationState::Loaded(FetchResult::Pending)
            | RelationState::Loaded(FetchResult::Failure(_))
            | RelationState::NotLoaded
            | RelationState::Cancelled => None,
        }
    }

    /// Start a cycle unless one is pending or has already completed.
    ///
    /// Never touches the fetcher when the pivot has no DOI.
    pub fn load_entries(&self) -> Result<LoadOutcome> {
        let mut slot = self.shared.lock();
        let doi = slot.pivot.clone().ok_or(RelationError::NoIdentifier)?;

        if slot.state.is_loading() {
            return Ok(LoadOutcome::AlreadyLoading);
        }
        if !slot.state.is_idle() {
            return Ok(LoadOutcome::AlreadyLoaded);
        }
        self.start_cycle(&mut slot, doi)
    }

    /// Cancel whatever is running, discard the cached result, and start over
    pub fn reload_entries(&self) -> Result<LoadOutcome> {
        let mut slot = self.shared.lock();
        let doi = slot.pivot.clone().ok_or(RelationError::NoIdentifier)?;

        tracing::debug!("Reloading {} for {}", self.kind.path(), doi);
        self.start_cycle(&mut slot, doi)
    }

    /// Cancel an in-flight fetch without starting another.
    ///
    /// Returns `false` (and publishes nothing) when nothing was pending.
    pub fn cancel_loading(&self) -> bool {
        let mut slot = self.shared.lock();
        if !slot.state.is_loading() {
            return false;
        }

        let id = match slot.cycle.take() {
            Some(cycle) => {
                cycle.token.cancel();
                slot.draining = Some(cycle.handle);
                cycle.id
            }
            None => slot.last_cycle,
        };

        tracing::debug!("Cancelled cycle {} for {}", id, display_pivot(&slot.pivot));
        slot.state = RelationState::Cancelled;
        self.shared.publish(id, RelationState::Cancelled);
        true
    }

    /// Swap to a different pivot. Any cycle for the old pivot is cancelled
    /// and the slot returns to `NotLoaded`.
    pub fn set_pivot(&self, pivot: &Entry) {
        let new_pivot = resolve(pivot);
        let mut slot = self.shared.lock();
        if slot.pivot == new_pivot {
            return;
        }

        if let Some(cycle) = slot.cycle.take() {
            cycle.token.cancel();
            slot.draining = Some(cycle.handle);
        }
        slot.pivot = new_pivot;
        slot.state = RelationState::NotLoaded;
        let id = slot.last_cycle;
        self.shared.publish(id, RelationState::NotLoaded);
    }

    fn start_cycle(&self, slot: &mut Slot, doi: Doi) -> Result<LoadOutcome> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| RelationError::Runtime(e.to_string()))?;

        // Supersede first: the old token fires before the new Pending is visible
        let previous = match slot.cycle.take() {
            Some(cycle) => {
                cycle.token.cancel();
                Some(cycle.handle)
            }
            None => slot.draining.take(),
        };

        slot.last_cycle += 1;
        let id = slot.last_cycle;
        let token = CancellationToken::new();

        slot.state = RelationState::Loaded(FetchResult::Pending);
        self.shared.publish(id, RelationState::Loaded(FetchResult::Pending));
        tracing::debug!("Starting cycle {} ({} for {})", id, self.kind.path(), doi);

        let handle = runtime.spawn(run_cycle(CycleTask {
            shared: Arc::clone(&self.shared),
            fetcher: Arc::clone(&self.fetcher),
            doi,
            kind: self.kind,
            id,
            token: token.clone(),
            previous,
            timeout: self.fetch_timeout,
        }));

        slot.cycle = Some(Cycle { id, token, handle });
        Ok(LoadOutcome::Started { cycle: id })
    }
}

impl Drop for RelationCoordinator {
    fn drop(&mut self) {
        let slot = self.shared.lock();
        if let Some(cycle) = slot.cycle.as_ref() {
            cycle.token.cancel();
        }
    }
}

struct CycleTask {
    shared: Arc<Shared>,
    fetcher: Arc<dyn RelationFetcher>,
    doi: Doi,
    kind: RelationKind,
    id: u64,
    token: CancellationToken,
    previous: Option<JoinHandle<()>>,
    timeout: Option<Duration>,
}

async fn run_cycle(task: CycleTask) {
    let CycleTask {
        shared,
        fetcher,
        doi,
        kind,
        id,
        token,
        previous,
        timeout,
    } = task;

    // Single-flight: wait for the superseded fetch to observe its cancellation
    if let Some(previous) = previous {
        let _ = previous.await;
    }
    if token.is_cancelled() {
        return;
    }

    shared.fetch_count.fetch_add(1, Ordering::SeqCst);

    // A panicking fetcher fails the cycle instead of leaving it pending
    let mut fetch = tokio::spawn({
        let token = token.clone();
        let doi = doi.clone();
        async move { fetcher.fetch(&doi, kind, token).await }
    });

    let result = match timeout {
        Some(limit) => {
            tokio::select! {
                joined = &mut fetch => flatten_join(joined),
                _ = tokio::time::sleep(limit) => {
                    token.cancel();
                    fetch.abort();
                    // Wait for the abort so the next cycle never overlaps this fetch
                    let _ = (&mut fetch).await;
                    tracing::warn!("Fetching {} for {} timed out after {:?}", kind.path(), doi, limit);
                    Err(FetchError::Timeout)
                }
            }
        }
        None => flatten_join(fetch.await),
    };

    shared.complete(id, kind, result);
}

fn flatten_join(
    joined: std::result::Result<std::result::Result<Vec<Entry>, FetchError>, JoinError>,
) -> std::result::Result<Vec<Entry>, FetchError> {
    match joined {
        Ok(result) => result,
        Err(error) if error.is_cancelled() => Err(FetchError::Cancelled),
        Err(error) => Err(FetchError::Internal {
            message: error.to_string(),
        }),
    }
}
