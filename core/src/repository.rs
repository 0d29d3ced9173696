//! Character repository: load state machine plus favorites projection.
//!
//! # Design
//! The repository owns the last fetched list and the favorites store, and it
//! is the whole surface a UI layer talks to: `load`, `favorite_characters`,
//! `toggle_favorite` and `subscribe`.
//!
//! State moves `Idle -> Loading -> Loaded | Error`; `Loaded` and `Error`
//! stay put until the next `load`. A `load` issued while another is in
//! flight joins it: the caller blocks until the running load finishes and
//! receives the same result, and observers see a single `Loading` /
//! completion pair.
//!
//! Observers are invoked after internal locks are released, so an observer
//! may call back into the repository. Delivery happens on the thread that
//! ran the load; hosts marshal onto their UI thread themselves.

use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, warn};

use crate::client::{CharacterClient, PageFetcher};
use crate::config::{Config, StorageFailurePolicy};
use crate::error::{FetchError, OpenError, StorageError};
use crate::favorites::{FavoritesStore, SqliteFavoritesStore};
use crate::http::Transport;
use crate::pagination::Paginator;
use crate::transport::UreqTransport;
use crate::types::{Character, CharacterId};

/// Observable load state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// No load has been requested yet.
    Idle,
    Loading,
    Loaded(Vec<Character>),
    Error(FetchError),
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl From<SubscriptionId> for u64 {
    fn from(id: SubscriptionId) -> Self {
        id.0
    }
}

impl From<u64> for SubscriptionId {
    fn from(raw: u64) -> Self {
        SubscriptionId(raw)
    }
}

type Observer = Arc<dyn Fn(&LoadState) + Send + Sync>;

struct LoadSlot {
    state: LoadState,
    /// Last successful list; survives a later failed load.
    characters: Vec<Character>,
    /// Bumped every time a load finishes.
    generation: u64,
    /// Callers parked in `load` waiting for the running load.
    waiters: usize,
    last_outcome: Option<Result<Vec<Character>, FetchError>>,
}

pub struct CharacterRepository<T, S> {
    fetcher: PageFetcher<T>,
    paginator: Paginator,
    policy: StorageFailurePolicy,
    favorites: Mutex<S>,
    slot: Mutex<LoadSlot>,
    load_finished: Condvar,
    observers: Mutex<Vec<(SubscriptionId, Observer)>>,
    next_subscription: AtomicU64,
}

impl CharacterRepository<UreqTransport, SqliteFavoritesStore> {
    /// Build a network-backed repository with an on-disk favorites database.
    ///
    /// The config is validated before the database is opened.
    pub fn open(config: &Config) -> Result<Self, OpenError> {
        config.validate()?;
        let store = SqliteFavoritesStore::open(&config.storage.database)?;
        Ok(Self::from_config(config, store))
    }

    /// Like `open`, but favorites live in an in-memory database and are
    /// lost when the repository is dropped.
    pub fn open_ephemeral(config: &Config) -> Result<Self, OpenError> {
        config.validate()?;
        let store = SqliteFavoritesStore::open_in_memory()?;
        Ok(Self::from_config(config, store))
    }

    fn from_config(config: &Config, store: SqliteFavoritesStore) -> Self {
        let fetcher = PageFetcher::new(
            CharacterClient::new(&config.api.base_url),
            UreqTransport::new(config.api.timeout()),
        );
        Self::new(fetcher, store)
            .with_paginator(Paginator::new(config.api.max_pages))
            .with_storage_policy(config.storage.on_failure)
    }
}

impl<T: Transport, S: FavoritesStore> CharacterRepository<T, S> {
    pub fn new(fetcher: PageFetcher<T>, favorites: S) -> Self {
        Self {
            fetcher,
            paginator: Paginator::default(),
            policy: StorageFailurePolicy::default(),
            favorites: Mutex::new(favorites),
            slot: Mutex::new(LoadSlot {
                state: LoadState::Idle,
                characters: Vec::new(),
                generation: 0,
                waiters: 0,
                last_outcome: None,
            }),
            load_finished: Condvar::new(),
            observers: Mutex::new(Vec::new()),
            // 0 is reserved as the "no subscription" value at the C boundary.
            next_subscription: AtomicU64::new(1),
        }
    }

    pub fn with_paginator(mut self, paginator: Paginator) -> Self {
        self.paginator = paginator;
        self
    }

    pub fn with_storage_policy(mut self, policy: StorageFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn fetcher(&self) -> &PageFetcher<T> {
        &self.fetcher
    }

    /// Fetch every page and replace the character list.
    ///
    /// Emits `Loading` and then `Loaded` or `Error` to every observer. If a
    /// load is already running, waits for it and returns its result instead
    /// of starting another fetch.
    pub fn load(&self) -> Result<Vec<Character>, FetchError> {
        let mut slot = self.lock_slot();
        if slot.state == LoadState::Loading {
            let started = slot.generation;
            slot.waiters += 1;
            debug!(waiters = slot.waiters, "joining in-flight load");
            slot = self
                .load_finished
                .wait_while(slot, |s| s.generation == started)
                .unwrap_or_else(PoisonError::into_inner);
            slot.waiters -= 1;
            if let Some(outcome) = &slot.last_outcome {
                return outcome.clone();
            }
        }
        slot.state = LoadState::Loading;
        drop(slot);
        self.run_load()
    }

    fn run_load(&self) -> Result<Vec<Character>, FetchError> {
        let mut in_flight = InFlightLoad {
            repo: self,
            finished: false,
        };
        self.notify(&LoadState::Loading);

        let start_url = self.fetcher.client().first_page_url();
        let outcome = self.paginator.collect(&self.fetcher, &start_url);
        in_flight.finished = true;
        self.finish_load(outcome)
    }

    /// Publish the outcome of a load and wake every joined caller.
    fn finish_load(&self, outcome: Result<Vec<Character>, FetchError>) -> Result<Vec<Character>, FetchError> {
        let state = match &outcome {
            Ok(characters) => LoadState::Loaded(characters.clone()),
            Err(err) => {
                warn!(error = %err, "character load failed");
                LoadState::Error(err.clone())
            }
        };

        {
            let mut slot = self.lock_slot();
            if let Ok(characters) = &outcome {
                slot.characters = characters.clone();
            }
            slot.state = state.clone();
            slot.generation += 1;
            slot.last_outcome = Some(outcome.clone());
        }
        self.load_finished.notify_all();
        self.notify(&state);
        outcome
    }

    pub fn state(&self) -> LoadState {
        self.lock_slot().state.clone()
    }

    /// The last successfully loaded list. Empty before the first success;
    /// stale (not cleared) after a failed reload.
    pub fn characters(&self) -> Vec<Character> {
        self.lock_slot().characters.clone()
    }

    pub fn character(&self, id: CharacterId) -> Option<Character> {
        self.lock_slot()
            .characters
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    /// Loaded characters whose id is a favorite, in list order.
    ///
    /// Empty unless the current state is `Loaded`. Favorite ids that no
    /// longer appear in the list are skipped.
    pub fn favorite_characters(&self) -> Result<Vec<Character>, StorageError> {
        let loaded = match &self.lock_slot().state {
            LoadState::Loaded(characters) => characters.clone(),
            _ => return Ok(Vec::new()),
        };
        let ids = self.lock_store().all_ids();
        let ids: HashSet<CharacterId> = match ids {
            Ok(ids) => ids.into_iter().collect(),
            Err(err) => return self.degrade("all_ids", err, Vec::new()),
        };
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(loaded.into_iter().filter(|c| ids.contains(&c.id)).collect())
    }

    pub fn is_favorite(&self, id: CharacterId) -> Result<bool, StorageError> {
        let found = self.lock_store().contains(id);
        match found {
            Ok(found) => Ok(found),
            Err(err) => self.degrade("contains", err, false),
        }
    }

    /// Flip the favorite flag for `id` and return the new value.
    ///
    /// Under the `Ignore` policy a failed write leaves the flag unchanged and
    /// reports the value it had before the attempt.
    pub fn toggle_favorite(&self, id: CharacterId) -> Result<bool, StorageError> {
        let mut store = self.lock_store();
        let was_favorite = match store.contains(id) {
            Ok(found) => found,
            Err(err) => return self.degrade("contains", err, false),
        };
        if was_favorite {
            match store.remove(id) {
                Ok(()) => Ok(false),
                Err(err) => self.degrade("remove", err, true),
            }
        } else {
            match store.add(id) {
                Ok(_) => Ok(true),
                Err(err) => self.degrade("add", err, false),
            }
        }
    }

    /// Register `observer` for every subsequent state transition.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&LoadState) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.lock_observers().push((id, Arc::new(observer)));
        id
    }

    /// Returns `false` if `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.lock_observers();
        let before = observers.len();
        observers.retain(|(sub, _)| *sub != id);
        observers.len() != before
    }

    fn notify(&self, state: &LoadState) {
        let observers: Vec<Observer> = self
            .lock_observers()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            if catch_unwind(AssertUnwindSafe(|| observer(state))).is_err() {
                error!(state = ?state, "state observer panicked");
            }
        }
    }

    fn degrade<R>(&self, operation: &str, err: StorageError, fallback: R) -> Result<R, StorageError> {
        match self.policy {
            StorageFailurePolicy::Ignore => {
                warn!(operation, error = %err, "favorites storage failed, continuing without it");
                Ok(fallback)
            }
            StorageFailurePolicy::Propagate => Err(err),
        }
    }

    fn lock_slot(&self) -> MutexGuard<'_, LoadSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_store(&self) -> MutexGuard<'_, S> {
        self.favorites.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_observers(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Observer)>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Moves the repository out of `Loading` if a load unwinds before it
/// publishes its outcome, so joined and later callers are not left waiting.
struct InFlightLoad<'a, T: Transport, S: FavoritesStore> {
    repo: &'a CharacterRepository<T, S>,
    finished: bool,
}

impl<T: Transport, S: FavoritesStore> Drop for InFlightLoad<'_, T, S> {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self
                .repo
                .finish_load(Err(FetchError::Transport("load aborted by a panic".to_string())));
        }
    }
}
