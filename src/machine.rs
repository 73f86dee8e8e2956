//! Job state machine.
//!
//! A synchronous reducer over [`JobState`]: every status payload, start
//! attempt, stop, and reset flows through here, and all lifecycle
//! invariants are enforced in one place with no I/O. The async layers
//! (poller, controller) only feed it events and act on the [`Outcome`].
//!
//! Stale responses are fenced with session tokens. Each accepted start
//! mints a new token; a status payload carrying an old token is discarded
//! without touching state, so a poll that raced a stop or restart can
//! never resurrect a finished job.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::api::RawStatus;
use crate::errors::{ClientError, JobFailure};
use crate::jobs::{JobHandle, JobKind, JobState, JobStatus};
use crate::poller::PollControl;

/// A user-visible event produced by a state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Completed { kind: JobKind },
    Failed { kind: JobKind, message: String },
}

/// A side effect the caller must run exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Apply the post-completion metric adjustment for this job kind.
    AdjustMetrics,
}

/// What a status application asks the caller to do.
#[derive(Debug)]
pub struct Outcome {
    pub control: PollControl,
    pub notification: Option<Notification>,
    pub effect: Option<Effect>,
}

impl Outcome {
    fn discard() -> Self {
        Self {
            control: PollControl::Stop,
            notification: None,
            effect: None,
        }
    }

    fn keep_polling() -> Self {
        Self {
            control: PollControl::Continue,
            notification: None,
            effect: None,
        }
    }
}

/// Reducer owning the authoritative [`JobState`] for one job kind.
#[derive(Debug)]
pub struct JobMachine {
    state: JobState,
    /// Token of the run currently allowed to mutate state, if any.
    active_session: Option<u64>,
    next_session: u64,
    /// Whether the metric adjustment for the current run already fired.
    effect_applied: bool,
    assumed_total_minutes: u32,
}

impl JobMachine {
    pub fn new(kind: JobKind, assumed_total_minutes: u32) -> Self {
        Self {
            state: JobState::idle(kind),
            active_session: None,
            next_session: 1,
            effect_applied: false,
            assumed_total_minutes,
        }
    }

    /// Current state, for snapshotting.
    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn kind(&self) -> JobKind {
        self.state.kind
    }

    /// Whether a start attempt is currently allowed.
    pub fn can_start(&self) -> bool {
        self.state.status == JobStatus::Idle
    }

    /// Whether `token` still identifies the live run.
    pub fn session_is_active(&self, token: u64) -> bool {
        self.active_session == Some(token)
    }

    /// Transition into `Running` and mint a session token for the new run.
    ///
    /// Allowed only from `Idle`; a finished run must be cleared with
    /// [`reset`](Self::reset) first, and a running job stopped. Returns the
    /// token the caller must present with every subsequent event for this
    /// run.
    pub fn begin_start(&mut self, now: DateTime<Utc>) -> Option<u64> {
        if self.state.status != JobStatus::Idle {
            return None;
        }

        let token = self.next_session;
        self.next_session += 1;
        self.active_session = Some(token);
        self.effect_applied = false;

        self.state.status = JobStatus::Running;
        self.state.progress = 0.0;
        self.state.current_step = "Starting...".to_string();
        self.state.estimated_remaining = estimate_remaining(0.0, self.assumed_total_minutes);
        self.state.started_at = Some(now);
        self.state.completed_at = None;
        self.state.handle = None;
        self.state.result = None;
        self.state.error = None;

        Some(token)
    }

    /// Record that the start request itself failed.
    pub fn start_failed(&mut self, token: u64, message: &str) {
        if self.active_session != Some(token) {
            return;
        }
        self.active_session = None;
        self.state.status = JobStatus::Error;
        self.state.error = Some(message.to_string());
        self.state.current_step = "Failed to start".to_string();
        self.state.estimated_remaining = "0 min".to_string();
    }

    /// Attach the server-assigned handle once the start is acknowledged.
    pub fn attach_handle(&mut self, token: u64, handle: JobHandle) {
        if self.active_session == Some(token) {
            self.state.handle = Some(handle);
        }
    }

    /// Fold one polled status payload into the state.
    pub fn apply_status(&mut self, token: u64, raw: RawStatus, now: DateTime<Utc>) -> Outcome {
        if self.active_session != Some(token) {
            debug!(kind = %self.state.kind, token, "discarding stale status payload");
            return Outcome::discard();
        }

        match raw {
            RawStatus::Running {
                progress,
                step_label,
                ..
            } => {
                if let Some(p) = progress {
                    // Progress never moves backwards within a run, even if
                    // the server momentarily reports a lower figure.
                    self.state.progress = self.state.progress.max(p.clamp(0.0, 100.0));
                }
                if let Some(step) = step_label {
                    self.state.current_step = step;
                }
                self.state.estimated_remaining =
                    estimate_remaining(self.state.progress, self.assumed_total_minutes);
                Outcome::keep_polling()
            }
            RawStatus::Finished { last_result } => {
                self.active_session = None;
                match last_result {
                    Some(lr) if lr.status.as_deref() == Some("completed") => {
                        self.state.status = JobStatus::Completed;
                        self.state.progress = 100.0;
                        self.state.current_step = "Completed".to_string();
                        self.state.estimated_remaining = "0 min".to_string();
                        self.state.completed_at = lr
                            .completed_at
                            .as_deref()
                            .and_then(parse_timestamp)
                            .or(Some(now));
                        self.state.result = Some(lr.to_value());
                        self.state.error = None;

                        let effect = if self.effect_applied {
                            None
                        } else {
                            self.effect_applied = true;
                            Some(Effect::AdjustMetrics)
                        };
                        Outcome {
                            control: PollControl::Stop,
                            notification: Some(Notification::Completed {
                                kind: self.state.kind,
                            }),
                            effect,
                        }
                    }
                    Some(lr) => {
                        let message = lr.error.clone().unwrap_or_else(|| {
                            format!(
                                "job ended with status {}",
                                lr.status.as_deref().unwrap_or("unknown")
                            )
                        });
                        let err = ClientError::RemoteJobFailed(JobFailure {
                            kind: self.state.kind.as_str().to_string(),
                            message,
                        });
                        self.fail(err, now)
                    }
                    None => self.fail(
                        ClientError::JobVanished(
                            "job is no longer running and reported no result".to_string(),
                        ),
                        now,
                    ),
                }
            }
        }
    }

    fn fail(&mut self, error: ClientError, now: DateTime<Utc>) -> Outcome {
        let message = error.to_string();
        self.state.status = JobStatus::Error;
        self.state.error = Some(message.clone());
        self.state.current_step = "Failed".to_string();
        self.state.estimated_remaining = "0 min".to_string();
        self.state.completed_at = Some(now);
        Outcome {
            control: PollControl::Stop,
            notification: Some(Notification::Failed {
                kind: self.state.kind,
                message,
            }),
            effect: None,
        }
    }

    /// Cancel the current run locally.
    ///
    /// Takes effect regardless of what the backend later says; the session
    /// token is invalidated so in-flight responses are discarded. Returns
    /// false if no run was active.
    pub fn stop(&mut self, now: DateTime<Utc>) -> bool {
        if self.state.status != JobStatus::Running {
            return false;
        }
        self.active_session = None;
        self.state.status = JobStatus::Cancelled;
        self.state.current_step = "Stopped".to_string();
        self.state.estimated_remaining = "0 min".to_string();
        self.state.completed_at = Some(now);
        true
    }

    /// Return from a terminal status to `Idle`, clearing run artifacts.
    /// No-op while `Running` or already `Idle`.
    pub fn reset(&mut self) -> bool {
        if !self.state.status.is_terminal() {
            return false;
        }
        self.state = JobState::idle(self.state.kind);
        self.effect_applied = false;
        true
    }
}

/// Remaining-time estimate from progress percent and an assumed total
/// duration. This is presentation only; completion is always decided by
/// the server, never by elapsed time.
fn estimate_remaining(progress: f64, total_minutes: u32) -> String {
    if progress >= 100.0 {
        return "0 min".to_string();
    }
    if progress <= 0.0 {
        return format!("{} min", total_minutes);
    }
    let remaining = (100.0 - progress) / 100.0 * total_minutes as f64;
    let rounded = remaining.round() as i64;
    if rounded >= 1 {
        format!("{} min", rounded)
    } else {
        "< 1 min".to_string()
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
