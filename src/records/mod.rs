//! Test and test-run records on top of the namespaced store.
//!
//! Each collection lives under one key as a JSON array, newest first. Every
//! mutation reads the whole array, changes one record and writes the whole
//! array back. The service keeps no cache, so reads always see the latest
//! write.

pub mod ids;
pub mod model;
pub mod seed;

pub use self::model::{
    RunStatus, StepStatus, Test, TestDraft, TestPatch, TestRun, TestRunDraft, TestStats,
    TestStatus, TestStep,
};

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};

use self::ids::{floor_above, IdClock};
use self::model::now_millis;
use crate::config::LatencyConfig;
use crate::error::{StoreError, StoreResult};
use crate::storage::LocalStore;

pub const TESTS_KEY: &str = "tests";
pub const TEST_RUNS_KEY: &str = "test-runs";

const RUN_ID_PREFIX: &str = "run-";

/// Artificial delays applied before each operation, so callers can show
/// loading states. All zero by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Latency {
    pub list_tests: Duration,
    pub mutate_test: Duration,
    pub list_runs: Duration,
    pub create_run: Duration,
}

impl Latency {
    pub fn none() -> Self {
        Self::default()
    }
}

impl From<&LatencyConfig> for Latency {
    fn from(cfg: &LatencyConfig) -> Self {
        if !cfg.enabled {
            return Self::none();
        }
        Self {
            list_tests: Duration::from_millis(cfg.list_tests_ms),
            mutate_test: Duration::from_millis(cfg.mutate_test_ms),
            list_runs: Duration::from_millis(cfg.list_runs_ms),
            create_run: Duration::from_millis(cfg.create_run_ms),
        }
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// CRUD operations for [`Test`] and [`TestRun`] records.
///
/// Read-modify-write cycles are serialized by an async lock, so concurrent
/// callers sharing one service never overwrite each other's changes.
/// Separate processes writing the same backend are not coordinated.
#[derive(Debug)]
pub struct TestService {
    store: LocalStore,
    latency: Latency,
    write_lock: Mutex<()>,
    ids: IdClock,
    /// Seed timestamps are relative to this instant, so unwritten seeds read
    /// the same on every call.
    seeded_at: DateTime<Utc>,
}

impl TestService {
    pub fn new(store: LocalStore, latency: Latency) -> Self {
        Self {
            store,
            latency,
            write_lock: Mutex::new(()),
            ids: IdClock::new(),
            seeded_at: now_millis(),
        }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    fn load_tests(&self) -> Vec<Test> {
        self.store
            .get_or_else(TESTS_KEY, || seed::default_tests(self.seeded_at))
    }

    fn load_runs(&self) -> Vec<TestRun> {
        self.store
            .get_or_else(TEST_RUNS_KEY, || seed::default_runs(self.seeded_at))
    }

    /// All tests, newest first. Seeded on first read.
    pub async fn list_tests(&self) -> Vec<Test> {
        pause(self.latency.list_tests).await;
        self.load_tests()
    }

    pub async fn get_test(&self, id: &str) -> Option<Test> {
        pause(self.latency.list_tests).await;
        self.load_tests().into_iter().find(|t| t.id == id)
    }

    pub async fn create_test(&self, draft: TestDraft) -> StoreResult<Test> {
        pause(self.latency.mutate_test).await;
        let _guard = self.write_lock.lock().await;

        let mut tests = self.load_tests();
        let id = floor_above(tests.iter().map(|t| t.id.as_str()), "")
            .and_then(|floor| self.ids.next(floor))
            .ok_or(StoreError::IdsExhausted { kind: "test" })?;
        let now = now_millis();
        let test = Test {
            id: id.to_string(),
            name: draft.name,
            steps: draft.steps,
            last_run: draft.last_run,
            status: draft.status,
            environment: draft.environment,
            created_at: now,
            updated_at: now,
        };

        tests.insert(0, test.clone());
        self.store.set(TESTS_KEY, &tests)?;

        info!(id = %test.id, name = %test.name, "Created test");
        Ok(test)
    }

    /// Merge `patch` into the test with `id` and refresh `updatedAt`.
    pub async fn update_test(&self, id: &str, patch: &TestPatch) -> StoreResult<Test> {
        pause(self.latency.mutate_test).await;
        let _guard = self.write_lock.lock().await;

        let mut tests = self.load_tests();
        let test = tests
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::not_found("Test", id))?;

        patch.apply_to(test);
        test.updated_at = now_millis().max(test.created_at);
        let updated = test.clone();

        self.store.set(TESTS_KEY, &tests)?;

        info!(id, status = %updated.status, "Updated test");
        Ok(updated)
    }

    /// Remove the test with `id`. Returns whether a record was removed;
    /// a missing id is not an error. Runs referencing the test are kept.
    pub async fn delete_test(&self, id: &str) -> StoreResult<bool> {
        pause(self.latency.mutate_test).await;
        let _guard = self.write_lock.lock().await;

        let mut tests = self.load_tests();
        let before = tests.len();
        tests.retain(|t| t.id != id);
        let removed = tests.len() != before;

        self.store.set(TESTS_KEY, &tests)?;

        if removed {
            info!(id, "Deleted test");
        } else {
            debug!(id, "Delete of unknown test ignored");
        }
        Ok(removed)
    }

    /// All runs, newest first, optionally restricted to one test id.
    /// An empty `test_id` means no filter.
    pub async fn list_test_runs(&self, test_id: Option<&str>) -> Vec<TestRun> {
        pause(self.latency.list_runs).await;
        let runs = self.load_runs();
        match test_id.filter(|id| !id.is_empty()) {
            Some(id) => runs.into_iter().filter(|r| r.test_id == id).collect(),
            None => runs,
        }
    }

    pub async fn create_test_run(&self, draft: TestRunDraft) -> StoreResult<TestRun> {
        pause(self.latency.create_run).await;
        let _guard = self.write_lock.lock().await;

        let mut runs = self.load_runs();
        let id = floor_above(runs.iter().map(|r| r.id.as_str()), RUN_ID_PREFIX)
            .and_then(|floor| self.ids.next(floor))
            .ok_or(StoreError::IdsExhausted { kind: "run" })?;
        let run = TestRun {
            id: format!("{}{}", RUN_ID_PREFIX, id),
            test_id: draft.test_id,
            status: draft.status,
            duration: draft.duration,
            timestamp: now_millis(),
            steps: draft.steps,
        };

        runs.insert(0, run.clone());
        self.store.set(TEST_RUNS_KEY, &runs)?;

        info!(id = %run.id, test_id = %run.test_id, status = %run.status, "Recorded test run");
        Ok(run)
    }

    pub async fn test_stats(&self) -> TestStats {
        TestStats::from_tests(&self.list_tests().await)
    }

    /// Drop every stored key in the namespace; the next read re-seeds.
    pub async fn reset(&self) -> StoreResult<usize> {
        let _guard = self.write_lock.lock().await;
        let removed = self.store.clear()?;
        info!(removed, "Reset record store");
        Ok(removed)
    }
}
