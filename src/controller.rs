//! Job orchestration: start, watch, stop, reset.
//!
//! A [`JobController`] ties together one [`JobMachine`], one [`JobPoller`],
//! and a [`JobApi`]. Consumers never touch the machine directly: they read
//! immutable snapshots from a watch channel and receive terminal events on
//! a broadcast channel.
//!
//! Locking discipline: the machine lives behind a `std::sync::Mutex` and
//! the guard is never held across an await. Every network call happens
//! with the lock released, and its result is re-validated against the
//! session token before it touches state.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use crate::client::JobApi;
use crate::config::{ClientConfig, JobProfile};
use crate::data::DataInventory;
use crate::errors::{ClientError, Result};
use crate::jobs::{JobKind, JobState};
use crate::machine::{Effect, JobMachine, Notification};
use crate::metrics::Metrics;
use crate::poller::{JobPoller, PollControl, PollSink};

/// Result of a start attempt that did not error.
///
/// Guard rejections are expected answers, not failures; callers show them
/// as hints ("upload data first"), not error banners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// A run is active or a finished run has not been reset yet.
    NotIdle,
    NoData,
}

struct Shared {
    kind: JobKind,
    machine: Mutex<JobMachine>,
    snapshot_tx: watch::Sender<JobState>,
    notify_tx: broadcast::Sender<Notification>,
    /// Shared dashboard metrics, adjusted once per completed run.
    /// Absent for job kinds that do not move the headline figures.
    metrics: Option<Arc<Mutex<Metrics>>>,
}

impl Shared {
    fn publish(&self, machine: &JobMachine) {
        self.snapshot_tx.send_replace(machine.state().clone());
    }

    fn run_effect(&self, effect: Effect) {
        match effect {
            Effect::AdjustMetrics => {
                if let Some(ref metrics) = self.metrics {
                    let mut m = metrics.lock().unwrap();
                    match self.kind {
                        JobKind::Pipeline => m.apply_pipeline_completion(),
                        JobKind::GeneticOptimization => m.apply_genetic_completion(),
                        JobKind::Simulation | JobKind::ForecastHybrid => {}
                    }
                    info!(kind = %self.kind, "applied post-completion metric adjustment");
                }
            }
        }
    }

    fn notify(&self, notification: Notification) {
        // No receivers is fine; events are fire-and-forget.
        let _ = self.notify_tx.send(notification);
    }
}

/// Feeds polled payloads from one run into the machine.
struct RunSink {
    shared: Arc<Shared>,
    token: u64,
}

impl PollSink for RunSink {
    fn on_status(&self, raw: crate::api::RawStatus) -> PollControl {
        let outcome = {
            let mut machine = self.shared.machine.lock().unwrap();
            let outcome = machine.apply_status(self.token, raw, Utc::now());
            self.shared.publish(&machine);
            outcome
        };

        if let Some(effect) = outcome.effect {
            self.shared.run_effect(effect);
        }
        if let Some(notification) = outcome.notification {
            self.shared.notify(notification);
        }
        outcome.control
    }
}

/// Orchestrates one job kind against a [`JobApi`].
pub struct JobController<A: JobApi> {
    api: Arc<A>,
    shared: Arc<Shared>,
    poller: Mutex<JobPoller>,
}

impl<A: JobApi> JobController<A> {
    pub fn new(
        api: Arc<A>,
        kind: JobKind,
        config: &ClientConfig,
        metrics: Option<Arc<Mutex<Metrics>>>,
    ) -> Self {
        let machine = JobMachine::new(kind, config.assumed_minutes(kind));
        let (snapshot_tx, _) = watch::channel(machine.state().clone());
        let (notify_tx, _) = broadcast::channel(16);

        Self {
            api,
            shared: Arc::new(Shared {
                kind,
                machine: Mutex::new(machine),
                snapshot_tx,
                notify_tx,
                metrics,
            }),
            poller: Mutex::new(JobPoller::new(Duration::from_millis(
                config.poll_interval_ms,
            ))),
        }
    }

    /// Controller for the full optimization pipeline.
    pub fn pipeline(api: Arc<A>, config: &ClientConfig, metrics: Arc<Mutex<Metrics>>) -> Self {
        Self::new(api, JobKind::Pipeline, config, Some(metrics))
    }

    /// Controller for standalone passenger-flow simulations.
    pub fn simulation(api: Arc<A>, config: &ClientConfig) -> Self {
        Self::new(api, JobKind::Simulation, config, None)
    }

    /// Controller for standalone genetic optimization runs.
    pub fn genetic(api: Arc<A>, config: &ClientConfig, metrics: Arc<Mutex<Metrics>>) -> Self {
        Self::new(api, JobKind::GeneticOptimization, config, Some(metrics))
    }

    /// Controller for standalone hybrid forecast training runs.
    pub fn hybrid(api: Arc<A>, config: &ClientConfig) -> Self {
        Self::new(api, JobKind::ForecastHybrid, config, None)
    }

    pub fn kind(&self) -> JobKind {
        self.shared.kind
    }

    /// Current state snapshot.
    pub fn snapshot(&self) -> JobState {
        self.shared.snapshot_tx.borrow().clone()
    }

    /// Subscribe to state snapshots. The receiver always starts with the
    /// current state.
    pub fn subscribe(&self) -> watch::Receiver<JobState> {
        self.shared.snapshot_tx.subscribe()
    }

    /// Subscribe to terminal notifications (completed / failed).
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.shared.notify_tx.subscribe()
    }

    /// Attempt to start a run with the given profile.
    ///
    /// Guards run before any network call: a busy controller or an empty
    /// data inventory answers locally. Once the backend acknowledges the
    /// start, a poll loop takes over until the run reaches a terminal
    /// state.
    pub async fn start(
        &self,
        profile: &impl JobProfile,
        inventory: &DataInventory,
    ) -> Result<StartOutcome> {
        if profile.kind() != self.shared.kind {
            return Err(ClientError::Validation(format!(
                "profile is for {} but controller runs {}",
                profile.kind(),
                self.shared.kind
            )));
        }
        if !inventory.has_data() {
            return Ok(StartOutcome::NoData);
        }

        let payload = self.begin_local(profile.to_payload());
        let Some((token, payload)) = payload else {
            return Ok(StartOutcome::NotIdle);
        };

        match self.api.start(self.shared.kind, payload).await {
            Ok(handle) => {
                let still_live = {
                    let mut machine = self.shared.machine.lock().unwrap();
                    machine.attach_handle(token, handle);
                    self.shared.publish(&machine);
                    machine.session_is_active(token)
                };
                // The user may have stopped while the request was in
                // flight; in that case the run is already cancelled and
                // polling would only chase a dead session.
                if still_live {
                    self.poller.lock().unwrap().begin(
                        self.api.clone(),
                        self.shared.kind,
                        Arc::new(RunSink {
                            shared: self.shared.clone(),
                            token,
                        }),
                    );
                }
                Ok(StartOutcome::Started)
            }
            Err(e) => {
                let message = e.to_string();
                {
                    let mut machine = self.shared.machine.lock().unwrap();
                    machine.start_failed(token, &message);
                    self.shared.publish(&machine);
                }
                self.shared.notify(Notification::Failed {
                    kind: self.shared.kind,
                    message,
                });
                Err(e)
            }
        }
    }

    fn begin_local(&self, payload: Value) -> Option<(u64, Value)> {
        let mut machine = self.shared.machine.lock().unwrap();
        let token = machine.begin_start(Utc::now())?;
        self.shared.publish(&machine);
        Some((token, payload))
    }

    /// Stop the active run.
    ///
    /// The local transition to `Cancelled` is unconditional and immediate;
    /// the remote stop request is best effort and a failure there never
    /// resurrects the run. Returns false if nothing was running.
    pub async fn stop(&self) -> bool {
        let stopped = {
            let mut machine = self.shared.machine.lock().unwrap();
            let stopped = machine.stop(Utc::now());
            if stopped {
                self.shared.publish(&machine);
            }
            stopped
        };

        if stopped {
            self.poller.lock().unwrap().end();
            if let Err(e) = self.api.stop(self.shared.kind).await {
                warn!(kind = %self.shared.kind, error = %e, "remote stop failed, run stays cancelled locally");
            }
        }
        stopped
    }

    /// Clear a terminal run back to idle.
    ///
    /// Like [`stop`](Self::stop), the local transition always wins; the
    /// remote reset is best effort. Returns false unless the run was in a
    /// terminal state.
    pub async fn reset(&self) -> bool {
        let reset = {
            let mut machine = self.shared.machine.lock().unwrap();
            let reset = machine.reset();
            if reset {
                self.shared.publish(&machine);
            }
            reset
        };

        if reset {
            if let Err(e) = self.api.reset(self.shared.kind).await {
                warn!(kind = %self.shared.kind, error = %e, "remote reset failed");
            }
        }
        reset
    }

    /// Dashboard metrics shared with this controller, if any.
    pub fn metrics(&self) -> Option<Metrics> {
        self.shared
            .metrics
            .as_ref()
            .map(|m| m.lock().unwrap().clone())
    }
}
