//! Wire types for the backend API.
//!
//! Server payloads are loosely shaped, so every response is deserialized
//! with permissive defaults and validated here, at the boundary, before any
//! state machine trusts its fields. Malformed shapes normalize to the
//! rejected/vanished branches instead of surfacing deep in job tracking.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Acknowledgement for a start request.
///
/// The server signals acceptance with `status: "started"`; anything else,
/// including a missing field, is a rejection.
#[derive(Debug, Clone, Deserialize)]
pub struct StartAck {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub pipeline_id: Option<Value>,
    #[serde(default)]
    pub simulation_id: Option<Value>,
    #[serde(default)]
    pub ga_id: Option<Value>,
    #[serde(default)]
    pub hybrid_id: Option<Value>,
}

impl StartAck {
    /// Whether the server accepted the start request.
    pub fn accepted(&self) -> bool {
        self.status.as_deref() == Some("started")
    }

    /// The job id the server assigned, if any, normalized to a string.
    pub fn job_id(&self) -> Option<String> {
        [
            &self.pipeline_id,
            &self.simulation_id,
            &self.ga_id,
            &self.hybrid_id,
        ]
        .into_iter()
        .flatten()
        .next()
        .map(|id| match id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// Why the server declined, best effort.
    pub fn rejection_reason(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.status.clone())
            .unwrap_or_else(|| "start not acknowledged".to_string())
    }
}

/// In-flight progress details from a status payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActiveJob {
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub current_step: Option<String>,
    #[serde(default)]
    pub current_generation: Option<i64>,
    #[serde(default)]
    pub current_fitness: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Terminal outcome reported by a status payload.
#[derive(Debug, Clone, Deserialize)]
pub struct LastResult {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl LastResult {
    /// The full result payload as a JSON object, including the fields
    /// pulled out during deserialization.
    pub fn to_value(&self) -> Value {
        let mut map = self.payload.clone();
        if let Some(ref s) = self.status {
            map.insert("status".to_string(), Value::String(s.clone()));
        }
        if let Some(ref c) = self.completed_at {
            map.insert("completed_at".to_string(), Value::String(c.clone()));
        }
        if let Some(ref e) = self.error {
            map.insert("error".to_string(), Value::String(e.clone()));
        }
        Value::Object(map)
    }
}

/// Raw status envelope shared by all job-status endpoints.
///
/// The per-kind field names differ (`current_pipeline`, `current_ga`,
/// `current_simulation`, `current_hybrid`) but the shape is the same, so
/// one envelope covers them all.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusEnvelope {
    #[serde(default)]
    pub is_running: bool,
    #[serde(default)]
    pub current_pipeline: Option<ActiveJob>,
    #[serde(default)]
    pub current_ga: Option<ActiveJob>,
    #[serde(default)]
    pub current_simulation: Option<ActiveJob>,
    #[serde(default)]
    pub current_hybrid: Option<ActiveJob>,
    #[serde(default)]
    pub last_result: Option<LastResult>,
}

impl StatusEnvelope {
    /// Normalize into the tagged union the polling layer consumes.
    ///
    /// The server is the single source of truth for whether a job is still
    /// running; elapsed time never decides completion.
    pub fn into_raw(self) -> RawStatus {
        if self.is_running {
            let active = self
                .current_pipeline
                .or(self.current_ga)
                .or(self.current_simulation)
                .or(self.current_hybrid)
                .unwrap_or_default();
            RawStatus::Running {
                progress: active.progress,
                step_label: active.current_step.clone(),
                extra: active,
            }
        } else {
            RawStatus::Finished {
                last_result: self.last_result,
            }
        }
    }
}

/// Discriminated status payload: either the job is still running, or it has
/// ended and `last_result` (if present) says how.
#[derive(Debug, Clone)]
pub enum RawStatus {
    Running {
        progress: Option<f64>,
        step_label: Option<String>,
        extra: ActiveJob,
    },
    Finished {
        last_result: Option<LastResult>,
    },
}

/// Summary figures from a forecast run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub next_week_passengers: i64,
    pub peak_hour: String,
    pub busiest_route: String,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Response from the Prophet/LSTM forecast endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub forecast: Option<ForecastSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_start_ack_accepted() {
        let ack: StartAck =
            serde_json::from_value(json!({"status": "started", "pipeline_id": 42})).unwrap();
        assert!(ack.accepted());
        assert_eq!(ack.job_id(), Some("42".to_string()));
    }

    #[test]
    fn test_start_ack_rejected_on_missing_status() {
        let ack: StartAck = serde_json::from_value(json!({"message": "busy"})).unwrap();
        assert!(!ack.accepted());
        assert_eq!(ack.job_id(), None);
    }

    #[test]
    fn test_envelope_running_pipeline() {
        let env: StatusEnvelope = serde_json::from_value(json!({
            "is_running": true,
            "current_pipeline": {"progress": 42.5, "current_step": "Genetic optimization"}
        }))
        .unwrap();

        match env.into_raw() {
            RawStatus::Running {
                progress,
                step_label,
                ..
            } => {
                assert_eq!(progress, Some(42.5));
                assert_eq!(step_label.as_deref(), Some("Genetic optimization"));
            }
            other => panic!("expected Running, got {:?}", other),
        }
    }

    #[test]
    fn test_envelope_running_without_details() {
        let env: StatusEnvelope = serde_json::from_value(json!({"is_running": true})).unwrap();
        match env.into_raw() {
            RawStatus::Running {
                progress,
                step_label,
                ..
            } => {
                assert_eq!(progress, None);
                assert_eq!(step_label, None);
            }
            other => panic!("expected Running, got {:?}", other),
        }
    }

    #[test]
    fn test_envelope_finished_with_result() {
        let env: StatusEnvelope = serde_json::from_value(json!({
            "is_running": false,
            "last_result": {
                "status": "completed",
                "completed_at": "2025-06-09T12:00:00Z",
                "successful_steps": 5,
                "total_steps": 5
            }
        }))
        .unwrap();

        match env.into_raw() {
            RawStatus::Finished {
                last_result: Some(lr),
            } => {
                assert_eq!(lr.status.as_deref(), Some("completed"));
                let value = lr.to_value();
                assert_eq!(value["successful_steps"], json!(5));
                assert_eq!(value["status"], json!("completed"));
            }
            other => panic!("expected Finished with result, got {:?}", other),
        }
    }

    #[test]
    fn test_envelope_vanished() {
        // Empty object: not running, no result. The state machine maps
        // this to an error rather than trusting a silent disappearance.
        let env: StatusEnvelope = serde_json::from_value(json!({})).unwrap();
        match env.into_raw() {
            RawStatus::Finished { last_result: None } => {}
            other => panic!("expected Finished without result, got {:?}", other),
        }
    }

    #[test]
    fn test_ga_envelope_fields() {
        let env: StatusEnvelope = serde_json::from_value(json!({
            "is_running": true,
            "current_ga": {"progress": 60.0, "current_generation": 18, "current_fitness": 91.2}
        }))
        .unwrap();
        match env.into_raw() {
            RawStatus::Running { progress, extra, .. } => {
                assert_eq!(progress, Some(60.0));
                assert_eq!(extra.current_generation, Some(18));
                assert_eq!(extra.current_fitness, Some(91.2));
            }
            other => panic!("expected Running, got {:?}", other),
        }
    }

    #[test]
    fn test_forecast_response() {
        let resp: ForecastResponse = serde_json::from_value(json!({
            "success": true,
            "model": "Prophet",
            "accuracy": 88.4,
            "forecast": {
                "next_week_passengers": 2847293,
                "peak_hour": "08:00-09:00",
                "busiest_route": "101",
                "confidence": 87.0
            }
        }))
        .unwrap();
        assert!(resp.success);
        assert_eq!(resp.forecast.unwrap().next_week_passengers, 2847293);
    }
}
