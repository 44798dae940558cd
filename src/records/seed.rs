//! Records returned the first time a collection has never been written.

use chrono::{DateTime, Duration, Utc};

use super::model::{RunStatus, Test, TestRun, TestStatus};

#[allow(clippy::too_many_arguments)]
fn seed_test(
    id: &str,
    name: &str,
    steps: u32,
    last_run: &str,
    status: TestStatus,
    environment: &str,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
) -> Test {
    Test {
        id: id.to_string(),
        name: name.to_string(),
        steps,
        last_run: last_run.to_string(),
        status,
        environment: environment.to_string(),
        created_at,
        updated_at,
    }
}

/// Four sample tests, timestamped relative to `now`.
pub fn default_tests(now: DateTime<Utc>) -> Vec<Test> {
    vec![
        seed_test(
            "1",
            "Login Flow - Happy Path",
            8,
            "2 hours ago",
            TestStatus::Passed,
            "staging",
            now - Duration::days(7),
            now - Duration::hours(2),
        ),
        seed_test(
            "2",
            "Checkout Process",
            15,
            "1 day ago",
            TestStatus::Failed,
            "production",
            now - Duration::days(14),
            now - Duration::days(1),
        ),
        seed_test(
            "3",
            "User Registration",
            12,
            "3 days ago",
            TestStatus::Passed,
            "dev",
            now - Duration::days(21),
            now - Duration::days(3),
        ),
        seed_test(
            "4",
            "Search Functionality",
            6,
            "Never",
            TestStatus::Pending,
            "staging",
            now - Duration::days(1),
            now - Duration::days(1),
        ),
    ]
}

/// One past run per seeded test.
pub fn default_runs(now: DateTime<Utc>) -> Vec<TestRun> {
    [
        ("run-1", "1", RunStatus::Passed, 2300, Duration::hours(2)),
        ("run-2", "2", RunStatus::Failed, 5100, Duration::days(1)),
        ("run-3", "3", RunStatus::Passed, 3700, Duration::days(3)),
        ("run-4", "4", RunStatus::Passed, 1900, Duration::days(5)),
    ]
    .into_iter()
    .map(|(id, test_id, status, duration, ago)| TestRun {
        id: id.to_string(),
        test_id: test_id.to_string(),
        status,
        duration,
        timestamp: now - ago,
        steps: Vec::new(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_timestamps_are_ordered() {
        let now = Utc::now();
        for test in default_tests(now) {
            assert!(test.updated_at >= test.created_at, "test {}", test.id);
            assert!(test.updated_at <= now);
        }
    }

    #[test]
    fn test_seed_runs_reference_seed_tests() {
        let now = Utc::now();
        let ids: Vec<String> = default_tests(now).into_iter().map(|t| t.id).collect();
        for run in default_runs(now) {
            assert!(ids.contains(&run.test_id));
            assert!(run.steps.is_empty());
        }
    }
}
