use std::sync::Arc;

use crate::records::{Latency, TestService};
use crate::settings::SettingsStore;
use crate::storage::LocalStore;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TestService>,
    pub settings: SettingsStore,
}

impl AppState {
    pub fn new(store: LocalStore, latency: Latency) -> Self {
        Self {
            settings: SettingsStore::new(store.clone()),
            service: Arc::new(TestService::new(store, latency)),
        }
    }
}
