//! Application state.

use std::sync::Arc;

use kestrel_core::{InMemoryRecordStore, RecordStore, SharedClock, system_clock};
use kestrel_store::{MemoryStore, SharedStore};

use crate::cache::CacheService;
use crate::health::HealthService;
use crate::operational::AdminOperationalView;
use crate::rate_limit::RateLimiter;
use crate::services::{AdminService, ProfileService, TodoService};
use crate::session::SessionStore;
use crate::settings::Settings;

/// Application state shared across all handlers.
///
/// Every component receives the same store handle; no component owns the
/// store.
#[derive(Clone)]
pub struct AppState {
    cache: CacheService,
    limiter: RateLimiter,
    sessions: SessionStore,
    operations: AdminOperationalView,
    health: HealthService,
    todos: TodoService,
    profiles: ProfileService,
    admin: AdminService,
    settings: Arc<Settings>,
}

impl AppState {
    pub fn new(
        store: SharedStore,
        records: Arc<dyn RecordStore>,
        settings: Settings,
        clock: SharedClock,
    ) -> Self {
        let cache = CacheService::new(store.clone(), settings.cache.clone());

        Self {
            limiter: RateLimiter::new(store.clone(), clock.clone(), settings.rate_limit),
            sessions: SessionStore::new(cache.clone(), clock.clone()),
            operations: AdminOperationalView::new(cache.clone(), clock.clone()),
            health: HealthService::new(store, records.clone(), clock),
            todos: TodoService::new(records.clone(), cache.clone()),
            profiles: ProfileService::new(records.clone(), cache.clone()),
            admin: AdminService::new(records, cache.clone()),
            cache,
            settings: Arc::new(settings),
        }
    }

    /// State over fresh in-process stores with default settings.
    pub fn in_memory() -> Self {
        let settings = Settings::default();
        let clock = system_clock();
        let store = Arc::new(MemoryStore::with_clock(
            settings.store.max_capacity(),
            clock.clone(),
        ));
        let records = Arc::new(InMemoryRecordStore::with_clock(clock.clone()));
        Self::new(store, records, settings, clock)
    }

    pub fn cache(&self) -> &CacheService {
        &self.cache
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn operations(&self) -> &AdminOperationalView {
        &self.operations
    }

    pub fn health(&self) -> &HealthService {
        &self.health
    }

    pub fn todos(&self) -> &TodoService {
        &self.todos
    }

    pub fn profiles(&self) -> &ProfileService {
        &self.profiles
    }

    pub fn admin(&self) -> &AdminService {
        &self.admin
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}
