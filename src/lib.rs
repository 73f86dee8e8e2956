//! Client library for the transit optimization backend.
//!
//! The backend runs long jobs (passenger-flow simulation, genetic schedule
//! optimization, hybrid demand forecasting, and a full pipeline chaining
//! them) and answers status polls. This crate owns the client side of
//! that contract:
//!
//! - [`RemoteJobClient`] speaks the HTTP API behind the [`JobApi`] trait
//! - [`JobPoller`] drives fixed-interval, non-overlapping status polls
//! - [`JobMachine`] is the synchronous lifecycle reducer with stale-response
//!   fencing
//! - [`JobController`] ties them together and exposes watch/broadcast
//!   channels for consumers
//!
//! Supporting modules cover configuration, dashboard metrics, the local
//! data inventory, and operator authentication.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod controller;
pub mod data;
pub mod errors;
pub mod http;
pub mod jobs;
pub mod machine;
pub mod metrics;
pub mod poller;

pub use api::{ForecastResponse, ForecastSummary, RawStatus};
pub use client::{JobApi, RemoteJobClient};
pub use config::{
    ClientConfig, Endpoints, ForecastModel, GaConfig, HybridConfig, JobProfile, PipelineConfig,
    SimulationConfig,
};
pub use controller::{JobController, StartOutcome};
pub use data::{DataInventory, UploadedFile};
pub use errors::{ClientError, Result};
pub use jobs::{JobHandle, JobKind, JobState, JobStatus};
pub use machine::{JobMachine, Notification};
pub use metrics::Metrics;
pub use poller::{JobPoller, PollControl, PollSink};
