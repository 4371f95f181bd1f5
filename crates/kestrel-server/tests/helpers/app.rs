//! Application fixture over in-process stores and a manual clock.

use std::sync::Arc;

use kestrel_core::{InMemoryRecordStore, ManualClock, SharedClock};
use kestrel_server::{AppState, Settings, create_router, metrics::detached_handle};
use kestrel_store::MemoryStore;

use super::client::TestClient;

/// Start of simulated time, aligned to a whole minute.
pub const START_MS: i64 = 1_700_000_040_000;

pub struct TestApp {
    pub state: AppState,
    pub store: MemoryStore,
    pub records: InMemoryRecordStore,
    pub clock: ManualClock,
    pub client: TestClient,
}

pub fn test_app() -> TestApp {
    test_app_with(Settings::default())
}

pub fn test_app_with(settings: Settings) -> TestApp {
    let clock = ManualClock::at_millis(START_MS);
    let shared: SharedClock = Arc::new(clock.clone());
    let store = MemoryStore::with_clock(10_000, shared.clone());
    let records = InMemoryRecordStore::with_clock(shared.clone());

    let state = AppState::new(
        Arc::new(store.clone()),
        Arc::new(records.clone()),
        settings,
        shared,
    );
    let client = TestClient::new(create_router(state.clone(), detached_handle()));

    TestApp {
        state,
        store,
        records,
        clock,
        client,
    }
}
