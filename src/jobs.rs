//! Job identity and lifecycle state.
//!
//! A job is one remote, long-running computation. [`JobState`] is the
//! authoritative, locally-owned record for one tracked job; views receive
//! immutable clones of it, never references into the state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The kinds of remote jobs the backend runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Simulation,
    GeneticOptimization,
    Pipeline,
    ForecastHybrid,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Simulation => "simulation",
            JobKind::GeneticOptimization => "genetic_optimization",
            JobKind::Pipeline => "pipeline",
            JobKind::ForecastHybrid => "forecast_hybrid",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Local job lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Idle,
    Running,
    Completed,
    Error,
    Cancelled,
}

impl JobStatus {
    /// Check if this is a terminal status: no further progress updates expected.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Error | JobStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Idle => "idle",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::Idle
    }
}

/// Identifies one invocation of a remote job.
///
/// The id is assigned by the backend and may be absent: some job kinds
/// acknowledge a start without returning one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub kind: JobKind,
    pub id: Option<String>,
}

impl JobHandle {
    pub fn new(kind: JobKind, id: Option<String>) -> Self {
        Self { kind, id }
    }
}

/// The authoritative local record for a tracked job.
///
/// Invariants, maintained by the state machine that owns this record:
/// at most one of `result`/`error` is present, consistent with `status`;
/// `progress` is 100 whenever `status` is `Completed` and is monotonically
/// non-decreasing while `Running`.
#[derive(Debug, Clone, Serialize)]
pub struct JobState {
    pub kind: JobKind,
    pub status: JobStatus,
    /// Percent complete, 0-100.
    pub progress: f64,
    /// Human-readable label for the current step, server-supplied or
    /// locally synthesized.
    pub current_step: String,
    /// Derived estimate of remaining time, e.g. "18 min" or "< 1 min".
    pub estimated_remaining: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub handle: Option<JobHandle>,
    /// Opaque result payload, present only when `status` is `Completed`.
    pub result: Option<Value>,
    /// Failure message, present only when `status` is `Error`.
    pub error: Option<String>,
}

impl JobState {
    /// A fresh idle state for the given job kind.
    pub fn idle(kind: JobKind) -> Self {
        Self {
            kind,
            status: JobStatus::Idle,
            progress: 0.0,
            current_step: "Ready to start".to_string(),
            estimated_remaining: "0 min".to_string(),
            started_at: None,
            completed_at: None,
            handle: None,
            result: None,
            error: None,
        }
    }
}
