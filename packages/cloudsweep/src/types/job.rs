//! Job lifecycle value object.
//!
//! A [`Job`] records one orchestration run: what was requested, where it
//! is in its lifecycle, and how delivery went. It is mutated only by the
//! task executing the run; once terminal it never changes again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle states of an extraction job.
///
/// `Pending → Running → {Completed | Failed}`. Terminal states are never
/// left. Pending exists only momentarily between construction and the
/// first unit of scheduled work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Whether this state can never be left.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status: {}", other)),
        }
    }
}

/// One extraction run: lifecycle, requested services, and outcome
/// counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Opaque unique id, generated at creation, never reused.
    pub id: Uuid,

    /// Current lifecycle state.
    pub status: JobStatus,

    /// Service list resolved at creation.
    pub services: Vec<String>,

    /// When the job was created.
    pub started_at: DateTime<Utc>,

    /// Set when the job reaches a terminal state.
    pub completed_at: Option<DateTime<Utc>>,

    /// Artifacts produced by the fan-out.
    pub total_artifacts: usize,

    /// Artifacts delivered successfully.
    pub successful_artifacts: usize,

    /// Artifacts whose delivery failed.
    pub failed_artifacts: usize,

    /// Append-only, human-readable error strings.
    pub errors: Vec<String>,
}

impl Job {
    /// Create a pending job with a fresh id.
    pub fn new(services: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Pending,
            services,
            started_at: Utc::now(),
            completed_at: None,
            total_artifacts: 0,
            successful_artifacts: 0,
            failed_artifacts: 0,
            errors: Vec::new(),
        }
    }

    /// Move a pending job to running.
    pub fn start(&mut self) {
        if self.status == JobStatus::Pending {
            self.status = JobStatus::Running;
        }
    }

    /// Mark the run completed. No-op once terminal.
    pub fn complete(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.status = JobStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    /// Mark the run failed with an explanatory error. No-op once terminal.
    pub fn fail(&mut self, error: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = JobStatus::Failed;
        self.errors.push(error.into());
        self.completed_at = Some(Utc::now());
    }

    /// Append an error without changing state.
    pub fn record_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    /// Record one delivery outcome.
    pub fn record_send(&mut self, delivered: bool) {
        if delivered {
            self.successful_artifacts += 1;
        } else {
            self.failed_artifacts += 1;
        }
    }

    /// Whether the job has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Wall-clock duration, once terminal.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|end| end - self.started_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_transitions() {
        let mut job = Job::new(vec!["ec2".to_string()]);
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.completed_at.is_none());

        job.start();
        assert_eq!(job.status, JobStatus::Running);

        job.complete();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.completed_at.is_some());
        assert!(job.duration().is_some());
    }

    #[test]
    fn test_terminal_states_are_sticky() {
        let mut job = Job::new(vec![]);
        job.start();
        job.fail("extractor blew up");
        assert_eq!(job.status, JobStatus::Failed);
        let completed_at = job.completed_at;

        job.complete();
        job.fail("second failure");
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.completed_at, completed_at);
        assert_eq!(job.errors.len(), 1);
    }

    #[test]
    fn test_start_does_not_resurrect() {
        let mut job = Job::new(vec![]);
        job.start();
        job.complete();
        job.start();
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[test]
    fn test_send_counters() {
        let mut job = Job::new(vec![]);
        job.record_send(true);
        job.record_send(true);
        job.record_send(false);
        assert_eq!(job.successful_artifacts, 2);
        assert_eq!(job.failed_artifacts, 1);
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(Job::new(vec![]).id, Job::new(vec![]).id);
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(status.to_string().parse::<JobStatus>(), Ok(status));
        }
    }
}
