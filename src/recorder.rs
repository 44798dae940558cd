//! Simulated recording session.
//!
//! A session collects steps while recording, then saves them as a new test
//! plus one run carrying the recorded step outcomes. Nothing drives a real
//! browser; callers feed the steps in.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::records::{
    RunStatus, StepStatus, Test, TestDraft, TestRun, TestRunDraft, TestService, TestStatus,
    TestStep,
};

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("recording already in progress")]
    AlreadyRecording,

    #[error("not recording")]
    NotRecording,

    #[error("stop the recording before saving")]
    StillRecording,

    #[error("nothing recorded")]
    Empty,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording { started_at: DateTime<Utc> },
    Stopped {
        started_at: DateTime<Utc>,
        stopped_at: DateTime<Utc>,
    },
}

/// Step counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StepSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub warning: usize,
    pub pending: usize,
}

#[derive(Debug, Clone)]
pub struct RecordingSession {
    state: RecorderState,
    steps: Vec<TestStep>,
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSession {
    pub fn new() -> Self {
        Self {
            state: RecorderState::Idle,
            steps: Vec::new(),
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, RecorderState::Recording { .. })
    }

    pub fn steps(&self) -> &[TestStep] {
        &self.steps
    }

    /// Start (or restart) recording. Restarting discards earlier steps.
    pub fn start(&mut self) -> Result<(), RecorderError> {
        if self.is_recording() {
            return Err(RecorderError::AlreadyRecording);
        }
        self.steps.clear();
        self.state = RecorderState::Recording {
            started_at: Utc::now(),
        };
        Ok(())
    }

    /// Append a step; ids run 1..n in recording order.
    pub fn record(
        &mut self,
        action: impl Into<String>,
        selector: impl Into<String>,
        status: StepStatus,
    ) -> Result<&TestStep, RecorderError> {
        if !self.is_recording() {
            return Err(RecorderError::NotRecording);
        }
        let id = self.steps.len() as u32 + 1;
        self.steps.push(TestStep {
            id,
            action: action.into(),
            selector: selector.into(),
            status,
        });
        Ok(&self.steps[self.steps.len() - 1])
    }

    pub fn stop(&mut self) -> Result<(), RecorderError> {
        match self.state {
            RecorderState::Recording { started_at } => {
                self.state = RecorderState::Stopped {
                    started_at,
                    stopped_at: Utc::now(),
                };
                Ok(())
            }
            _ => Err(RecorderError::NotRecording),
        }
    }

    pub fn summary(&self) -> StepSummary {
        let mut summary = StepSummary {
            total: self.steps.len(),
            ..StepSummary::default()
        };
        for step in &self.steps {
            match step.status {
                StepStatus::Passed => summary.passed += 1,
                StepStatus::Failed => summary.failed += 1,
                StepStatus::Warning => summary.warning += 1,
                StepStatus::Pending => summary.pending += 1,
            }
        }
        summary
    }

    /// Milliseconds between start and stop, once stopped.
    pub fn duration_ms(&self) -> Option<u64> {
        match self.state {
            RecorderState::Stopped {
                started_at,
                stopped_at,
            } => Some((stopped_at - started_at).num_milliseconds().max(0) as u64),
            _ => None,
        }
    }

    /// Persist the recording as a new test and its first run.
    ///
    /// Any failed step marks both the run and the test as failed; warnings
    /// do not. If the run cannot be stored, the new test is deleted again
    /// before the error is returned.
    pub async fn save(
        &self,
        service: &TestService,
        name: impl Into<String>,
        environment: impl Into<String>,
    ) -> Result<(Test, TestRun), RecorderError> {
        let duration = match self.state {
            RecorderState::Recording { .. } => return Err(RecorderError::StillRecording),
            RecorderState::Idle => return Err(RecorderError::Empty),
            RecorderState::Stopped { .. } => self.duration_ms().unwrap_or(0),
        };
        if self.steps.is_empty() {
            return Err(RecorderError::Empty);
        }

        let failed = self.steps.iter().any(|s| s.status == StepStatus::Failed);
        let test = service
            .create_test(TestDraft {
                name: name.into(),
                steps: self.steps.len() as u32,
                last_run: "Just now".to_string(),
                status: if failed {
                    TestStatus::Failed
                } else {
                    TestStatus::Passed
                },
                environment: environment.into(),
            })
            .await?;

        let run = match service
            .create_test_run(TestRunDraft {
                test_id: test.id.clone(),
                status: if failed {
                    RunStatus::Failed
                } else {
                    RunStatus::Passed
                },
                duration,
                steps: self.steps.clone(),
            })
            .await
        {
            Ok(run) => run,
            Err(e) => {
                if let Err(cleanup) = service.delete_test(&test.id).await {
                    warn!(
                        test_id = %test.id,
                        error = %cleanup,
                        "Failed to remove test after run save failed"
                    );
                }
                return Err(e.into());
            }
        };

        info!(test_id = %test.id, run_id = %run.id, steps = self.steps.len(), "Saved recording");
        Ok((test, run))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Latency;
    use crate::storage::{LocalStore, MemoryBackend};
    use std::sync::Arc;

    fn recorded(statuses: &[StepStatus]) -> RecordingSession {
        let mut session = RecordingSession::new();
        session.start().unwrap();
        for (i, status) in statuses.iter().enumerate() {
            session
                .record(format!("Step {}", i), "body", *status)
                .unwrap();
        }
        session.stop().unwrap();
        session
    }

    #[test]
    fn test_lifecycle() {
        let mut session = RecordingSession::new();
        assert!(matches!(
            session.record("Click", "button", StepStatus::Passed),
            Err(RecorderError::NotRecording)
        ));
        assert!(matches!(session.stop(), Err(RecorderError::NotRecording)));

        session.start().unwrap();
        assert!(matches!(session.start(), Err(RecorderError::AlreadyRecording)));
        let step = session
            .record("Navigate to https://example.com", "page.goto()", StepStatus::Passed)
            .unwrap();
        assert_eq!(step.id, 1);
        let step = session
            .record("Click button 'Login'", "button[data-testid='login-btn']", StepStatus::Passed)
            .unwrap();
        assert_eq!(step.id, 2);

        session.stop().unwrap();
        assert!(session.duration_ms().is_some());
        assert_eq!(session.steps().len(), 2);
    }

    #[test]
    fn test_restart_discards_steps() {
        let mut session = recorded(&[StepStatus::Passed]);
        session.start().unwrap();
        assert!(session.steps().is_empty());
    }

    #[test]
    fn test_summary_counts() {
        let session = recorded(&[
            StepStatus::Passed,
            StepStatus::Passed,
            StepStatus::Passed,
            StepStatus::Warning,
        ]);
        let summary = session.summary();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.passed, 3);
        assert_eq!(summary.warning, 1);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn test_save_creates_test_and_run() {
        let service = TestService::new(LocalStore::in_memory(), Latency::none());
        let session = recorded(&[StepStatus::Passed, StepStatus::Warning]);

        let (test, run) = session.save(&service, "Login", "staging").await.unwrap();
        assert_eq!(test.steps, 2);
        assert_eq!(test.status, TestStatus::Passed);
        assert_eq!(test.last_run, "Just now");
        assert_eq!(run.test_id, test.id);
        assert_eq!(run.status, RunStatus::Passed);
        assert_eq!(run.steps.len(), 2);

        let runs = service.list_test_runs(Some(test.id.as_str())).await;
        assert_eq!(runs, vec![run]);
    }

    #[tokio::test]
    async fn test_failed_step_fails_the_run() {
        let service = TestService::new(LocalStore::in_memory(), Latency::none());
        let session = recorded(&[StepStatus::Passed, StepStatus::Failed]);
        let (test, run) = session.save(&service, "Checkout", "dev").await.unwrap();
        assert_eq!(test.status, TestStatus::Failed);
        assert_eq!(run.status, RunStatus::Failed);
    }

    #[tokio::test]
    async fn test_save_requires_stopped_non_empty_session() {
        let service = TestService::new(LocalStore::in_memory(), Latency::none());

        let mut session = RecordingSession::new();
        assert!(matches!(
            session.save(&service, "x", "dev").await,
            Err(RecorderError::Empty)
        ));

        session.start().unwrap();
        session.record("Click", "a", StepStatus::Passed).unwrap();
        assert!(matches!(
            session.save(&service, "x", "dev").await,
            Err(RecorderError::StillRecording)
        ));

        let empty = recorded(&[]);
        assert!(matches!(
            empty.save(&service, "x", "dev").await,
            Err(RecorderError::Empty)
        ));
        assert_eq!(service.list_tests().await.len(), 4);
    }

    #[tokio::test]
    async fn test_run_write_failure_removes_new_test() {
        // Room for the tests collection, not for a run carrying a huge step.
        let backend = Arc::new(MemoryBackend::with_quota(2_500));
        let service = TestService::new(LocalStore::new(backend), Latency::none());

        let mut session = RecordingSession::new();
        session.start().unwrap();
        session
            .record("Click", "x".repeat(2_000), StepStatus::Passed)
            .unwrap();
        session.stop().unwrap();

        let err = session.save(&service, "Too big", "dev").await.unwrap_err();
        assert!(matches!(
            err,
            RecorderError::Store(StoreError::StorageWrite { .. })
        ));

        let tests = service.list_tests().await;
        assert_eq!(tests.len(), 4);
        assert!(tests.iter().all(|t| t.name != "Too big"));
        assert_eq!(service.list_test_runs(None).await.len(), 4);
    }
}
