//! Fixed-interval status polling.
//!
//! One [`JobPoller`] drives at most one background poll loop at a time.
//! The loop awaits each request to completion before sleeping again, so
//! polls never overlap even when the backend responds slower than the
//! interval. Who decides when polling stops is the sink, which is fed
//! every payload and every error.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::api::RawStatus;
use crate::client::JobApi;
use crate::errors::ClientError;
use crate::jobs::JobKind;

/// Whether the poll loop should keep going after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollControl {
    Continue,
    Stop,
}

/// Consumer of poll results.
///
/// `on_error` defaults to logging and continuing: a failed poll says
/// nothing about the job, which is still running server-side.
pub trait PollSink: Send + Sync + 'static {
    fn on_status(&self, raw: RawStatus) -> PollControl;

    fn on_error(&self, error: ClientError) -> PollControl {
        warn!(%error, "status poll failed, will retry");
        PollControl::Continue
    }
}

/// Owns the background polling task for one job.
#[derive(Debug)]
pub struct JobPoller {
    interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl JobPoller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            task: None,
        }
    }

    /// Start polling `kind` against `api`, feeding results to `sink`.
    ///
    /// Any previous loop owned by this poller is ended first. The first
    /// poll fires one full interval after this call.
    pub fn begin<A, S>(&mut self, api: Arc<A>, kind: JobKind, sink: Arc<S>)
    where
        A: JobApi,
        S: PollSink,
    {
        self.end();

        let interval = self.interval;
        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick resolves immediately; skip it so the loop
            // waits a full interval before the first request.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let control = match api.poll_status(kind).await {
                    Ok(raw) => sink.on_status(raw),
                    Err(e) => sink.on_error(e),
                };
                if control == PollControl::Stop {
                    debug!(kind = %kind, "poll loop stopped");
                    break;
                }
            }
        }));
    }

    /// Stop the poll loop, if one is running. Idempotent.
    pub fn end(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Whether a poll loop is currently live.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }
}

impl Drop for JobPoller {
    fn drop(&mut self) {
        self.end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::StatusEnvelope;
    use crate::errors::Result;
    use crate::jobs::JobHandle;
    use serde_json::{json, Value};
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedApi {
        responses: Mutex<Vec<Result<RawStatus>>>,
        polls: AtomicUsize,
    }

    impl ScriptedApi {
        fn new(responses: Vec<Result<RawStatus>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                polls: AtomicUsize::new(0),
            }
        }

        fn running(progress: f64) -> Result<RawStatus> {
            let env: StatusEnvelope = serde_json::from_value(json!({
                "is_running": true,
                "current_pipeline": {"progress": progress}
            }))
            .unwrap();
            Ok(env.into_raw())
        }

        fn finished() -> Result<RawStatus> {
            let env: StatusEnvelope = serde_json::from_value(json!({
                "is_running": false,
                "last_result": {"status": "completed"}
            }))
            .unwrap();
            Ok(env.into_raw())
        }
    }

    impl JobApi for ScriptedApi {
        fn start(
            &self,
            _kind: JobKind,
            _payload: Value,
        ) -> impl Future<Output = Result<JobHandle>> + Send {
            async { unimplemented!("not polled in these tests") }
        }

        fn poll_status(&self, _kind: JobKind) -> impl Future<Output = Result<RawStatus>> + Send {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let next = {
                let mut responses = self.responses.lock().unwrap();
                if responses.is_empty() {
                    Self::running(50.0)
                } else {
                    responses.remove(0)
                }
            };
            async move { next }
        }

        fn stop(&self, _kind: JobKind) -> impl Future<Output = Result<()>> + Send {
            async { Ok(()) }
        }

        fn reset(&self, _kind: JobKind) -> impl Future<Output = Result<()>> + Send {
            async { Ok(()) }
        }
    }

    struct CountingSink {
        statuses: AtomicUsize,
        errors: AtomicUsize,
        stop_after: usize,
    }

    impl PollSink for CountingSink {
        fn on_status(&self, _raw: RawStatus) -> PollControl {
            let n = self.statuses.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= self.stop_after {
                PollControl::Stop
            } else {
                PollControl::Continue
            }
        }

        fn on_error(&self, _error: ClientError) -> PollControl {
            self.errors.fetch_add(1, Ordering::SeqCst);
            PollControl::Continue
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_at_interval_until_stopped() {
        let api = Arc::new(ScriptedApi::new(vec![
            ScriptedApi::running(10.0),
            ScriptedApi::running(40.0),
            ScriptedApi::finished(),
        ]));
        let sink = Arc::new(CountingSink {
            statuses: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            stop_after: 3,
        });

        let mut poller = JobPoller::new(Duration::from_millis(2000));
        poller.begin(api.clone(), JobKind::Pipeline, sink.clone());

        // Nothing fires before the first interval elapses.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(api.polls.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(6000)).await;
        assert_eq!(sink.statuses.load(Ordering::SeqCst), 3);
        assert_eq!(sink.errors.load(Ordering::SeqCst), 0);

        // The loop ended after the sink said Stop.
        tokio::time::sleep(Duration::from_millis(6000)).await;
        assert_eq!(api.polls.load(Ordering::SeqCst), 3);
        assert!(!poller.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_errors_do_not_stop_the_loop() {
        let api = Arc::new(ScriptedApi::new(vec![
            Err(ClientError::Validation("synthetic".to_string())),
            Err(ClientError::Validation("synthetic".to_string())),
            ScriptedApi::running(5.0),
        ]));
        let sink = Arc::new(CountingSink {
            statuses: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            stop_after: 1,
        });

        let mut poller = JobPoller::new(Duration::from_millis(2000));
        poller.begin(api, JobKind::Pipeline, sink.clone());

        tokio::time::sleep(Duration::from_millis(7000)).await;
        assert_eq!(sink.errors.load(Ordering::SeqCst), 2);
        assert_eq!(sink.statuses.load(Ordering::SeqCst), 1);
        assert!(!poller.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_is_idempotent() {
        let api = Arc::new(ScriptedApi::new(vec![]));
        let sink = Arc::new(CountingSink {
            statuses: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            stop_after: usize::MAX,
        });

        let mut poller = JobPoller::new(Duration::from_millis(2000));
        poller.begin(api.clone(), JobKind::Pipeline, sink);

        poller.end();
        poller.end();
        assert!(!poller.is_active());

        let before = api.polls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(api.polls.load(Ordering::SeqCst), before);
    }
}
