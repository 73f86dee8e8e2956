//! Client configuration and job launch profiles.
//!
//! Defaults come from environment variables where available, with fallbacks
//! matching the standard local deployment. A TOML file can override any
//! field; unknown keys are rejected so typos surface early.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;

use crate::errors::{ClientError, Result};
use crate::jobs::JobKind;

const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// API paths for every backend operation, relative to the base URL.
///
/// Kept configurable so a client can follow a backend that mounts the API
/// under a prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Endpoints {
    pub health: String,
    pub run_simulation: String,
    pub simulation_status: String,
    pub genetic_optimize: String,
    pub ga_status: String,
    pub run_pipeline: String,
    pub pipeline_status: String,
    pub stop_pipeline: String,
    pub reset_pipeline: String,
    pub run_hybrid: String,
    pub hybrid_status: String,
    pub prophet_forecast: String,
    pub lstm_forecast: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            health: "/test".to_string(),
            run_simulation: "/api/run-simulation".to_string(),
            simulation_status: "/api/simulation-status".to_string(),
            genetic_optimize: "/api/genetic-optimize".to_string(),
            ga_status: "/api/ga-status".to_string(),
            run_pipeline: "/api/run-pipeline".to_string(),
            pipeline_status: "/api/pipeline-status".to_string(),
            stop_pipeline: "/api/stop-pipeline".to_string(),
            reset_pipeline: "/api/reset-pipeline".to_string(),
            run_hybrid: "/api/run-hybrid-model".to_string(),
            hybrid_status: "/api/hybrid-model-status".to_string(),
            prophet_forecast: "/api/prophet-forecast".to_string(),
            lstm_forecast: "/api/lstm-forecast".to_string(),
        }
    }
}

impl Endpoints {
    /// The start endpoint for a job kind.
    pub fn start_path(&self, kind: JobKind) -> &str {
        match kind {
            JobKind::Simulation => &self.run_simulation,
            JobKind::GeneticOptimization => &self.genetic_optimize,
            JobKind::Pipeline => &self.run_pipeline,
            JobKind::ForecastHybrid => &self.run_hybrid,
        }
    }

    /// The status endpoint for a job kind.
    pub fn status_path(&self, kind: JobKind) -> &str {
        match kind {
            JobKind::Simulation => &self.simulation_status,
            JobKind::GeneticOptimization => &self.ga_status,
            JobKind::Pipeline => &self.pipeline_status,
            JobKind::ForecastHybrid => &self.hybrid_status,
        }
    }
}

/// Top-level client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ClientConfig {
    /// Backend base URL. Env override: `TRANSIT_BACKEND_URL`.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Interval between status polls in milliseconds.
    pub poll_interval_ms: u64,
    /// Assumed wall-clock duration of a full pipeline run, used only for
    /// the remaining-time estimate shown alongside progress.
    pub assumed_pipeline_minutes: u32,
    /// Assumed duration of a single-stage job (simulation, GA, hybrid).
    pub assumed_job_minutes: u32,
    pub endpoints: Endpoints,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("TRANSIT_BACKEND_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            timeout_secs: 30,
            poll_interval_ms: 2000,
            assumed_pipeline_minutes: 18,
            assumed_job_minutes: 5,
            endpoints: Endpoints::default(),
        }
    }
}

impl ClientConfig {
    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ClientError::Config(format!("invalid config: {}", e)))
    }

    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Assumed total minutes for remaining-time estimates of a job kind.
    pub fn assumed_minutes(&self, kind: JobKind) -> u32 {
        match kind {
            JobKind::Pipeline => self.assumed_pipeline_minutes,
            _ => self.assumed_job_minutes,
        }
    }
}

/// Forecast model selector for the one-shot forecast endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastModel {
    Prophet,
    Lstm,
}

impl ForecastModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastModel::Prophet => "prophet",
            ForecastModel::Lstm => "lstm",
        }
    }
}

/// A launch profile: the parameters posted to a job's start endpoint.
pub trait JobProfile {
    /// Which job kind this profile starts.
    fn kind(&self) -> JobKind;

    /// The JSON body for the start request.
    fn to_payload(&self) -> Value;
}

/// Parameters for a full pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PipelineConfig {
    pub start_date: String,
    pub end_date: String,
    pub population_size: u32,
    pub generations: u32,
    pub hybrid_epochs: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            start_date: "2025-06-02".to_string(),
            end_date: "2025-06-09".to_string(),
            population_size: 25,
            generations: 35,
            hybrid_epochs: 60,
        }
    }
}

impl JobProfile for PipelineConfig {
    fn kind(&self) -> JobKind {
        JobKind::Pipeline
    }

    fn to_payload(&self) -> Value {
        json!({
            "start_date": self.start_date,
            "end_date": self.end_date,
            "population_size": self.population_size,
            "generations": self.generations,
            "hybrid_epochs": self.hybrid_epochs,
        })
    }
}

/// Parameters for a standalone passenger-flow simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SimulationConfig {
    pub start_date: String,
    pub end_date: String,
    /// Simulated duration in days.
    pub duration_days: u32,
    /// Simulation tick in minutes.
    pub time_step_minutes: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_date: "2025-06-02".to_string(),
            end_date: "2025-06-09".to_string(),
            duration_days: 7,
            time_step_minutes: 5,
        }
    }
}

impl JobProfile for SimulationConfig {
    fn kind(&self) -> JobKind {
        JobKind::Simulation
    }

    fn to_payload(&self) -> Value {
        json!({
            "start_date": self.start_date,
            "end_date": self.end_date,
            "duration": self.duration_days,
            "time_step": self.time_step_minutes,
        })
    }
}

/// Parameters for a standalone genetic-algorithm optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct GaConfig {
    pub population_size: u32,
    pub generations: u32,
    pub mutation_rate: f64,
    pub crossover_rate: f64,
    pub elite_size: u32,
    /// Which dataset the GA optimizes against, e.g. "simulation".
    pub data_source: String,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 20,
            generations: 30,
            mutation_rate: 0.05,
            crossover_rate: 0.8,
            elite_size: 2,
            data_source: "simulation".to_string(),
        }
    }
}

impl JobProfile for GaConfig {
    fn kind(&self) -> JobKind {
        JobKind::GeneticOptimization
    }

    fn to_payload(&self) -> Value {
        json!({
            "population_size": self.population_size,
            "max_generations": self.generations,
            "mutation_rate": self.mutation_rate,
            "crossover_rate": self.crossover_rate,
            "elite_size": self.elite_size,
            "data_source": self.data_source,
        })
    }
}

/// Parameters for a standalone hybrid forecast training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct HybridConfig {
    pub sequence_length: u32,
    pub epochs: u32,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            sequence_length: 48,
            epochs: 60,
        }
    }
}

impl JobProfile for HybridConfig {
    fn kind(&self) -> JobKind {
        JobKind::ForecastHybrid
    }

    fn to_payload(&self) -> Value {
        json!({
            "sequence_length": self.sequence_length,
            "epochs": self.epochs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.poll_interval_ms, 2000);
        assert_eq!(cfg.assumed_minutes(JobKind::Pipeline), 18);
        assert_eq!(cfg.assumed_minutes(JobKind::Simulation), 5);
        assert_eq!(cfg.endpoints.start_path(JobKind::Pipeline), "/api/run-pipeline");
        assert_eq!(
            cfg.endpoints.status_path(JobKind::GeneticOptimization),
            "/api/ga-status"
        );
    }

    #[test]
    fn test_from_toml() {
        let cfg = ClientConfig::from_toml_str(
            r#"
            base_url = "http://backend:8080"
            poll_interval_ms = 500

            [endpoints]
            run_pipeline = "/v2/run-pipeline"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.base_url, "http://backend:8080");
        assert_eq!(cfg.poll_interval_ms, 500);
        assert_eq!(cfg.endpoints.run_pipeline, "/v2/run-pipeline");
        // Unset fields keep their defaults.
        assert_eq!(cfg.timeout_secs, 30);
        assert_eq!(cfg.endpoints.ga_status, "/api/ga-status");
    }

    #[test]
    fn test_from_toml_rejects_unknown_keys() {
        let err = ClientConfig::from_toml_str("base_urll = \"oops\"").unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_pipeline_payload() {
        let payload = PipelineConfig::default().to_payload();
        assert_eq!(payload["start_date"], "2025-06-02");
        assert_eq!(payload["population_size"], 25);
        assert_eq!(payload["generations"], 35);
        assert_eq!(payload["hybrid_epochs"], 60);
    }

    #[test]
    fn test_ga_payload() {
        let payload = GaConfig::default().to_payload();
        assert_eq!(payload["population_size"], 20);
        assert_eq!(payload["max_generations"], 30);
        assert_eq!(payload["mutation_rate"], 0.05);
        assert_eq!(payload["elite_size"], 2);
    }
}
