//! Network performance metrics and post-optimization adjustments.
//!
//! The dashboard shows four headline figures. When an optimization job
//! completes, the figures are scaled by fixed improvement factors exactly
//! once per completed run; the factors differ between the full pipeline
//! and the standalone genetic optimizer.

use serde::{Deserialize, Serialize};

/// Headline network metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metrics {
    /// Average passenger wait time, minutes.
    pub avg_wait_time_mins: f64,
    /// Mean vehicle occupancy, percent.
    pub occupancy_rate_pct: f64,
    /// Share of departures on time, percent.
    pub on_time_performance_pct: f64,
    /// Share of trips over crowding threshold, fraction 0-1.
    pub overcrowding_rate: f64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            avg_wait_time_mins: 8.2,
            occupancy_rate_pct: 67.0,
            on_time_performance_pct: 92.1,
            overcrowding_rate: 0.029,
        }
    }
}

impl Metrics {
    /// Apply the improvement factors for a completed full pipeline run.
    pub fn apply_pipeline_completion(&mut self) {
        self.avg_wait_time_mins = (self.avg_wait_time_mins * 0.85).max(0.0);
        self.occupancy_rate_pct = (self.occupancy_rate_pct * 1.12).min(100.0);
        self.on_time_performance_pct = (self.on_time_performance_pct * 1.08).min(100.0);
        self.overcrowding_rate = (self.overcrowding_rate * 0.6).max(0.0);
    }

    /// Apply the improvement factors for a completed standalone GA run.
    ///
    /// On-time performance caps at 98 rather than 100: the GA alone cannot
    /// fix disruptions outside the schedule.
    pub fn apply_genetic_completion(&mut self) {
        self.avg_wait_time_mins = (self.avg_wait_time_mins * 0.82).max(0.0);
        self.on_time_performance_pct = (self.on_time_performance_pct * 1.08).min(98.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let m = Metrics::default();
        assert_eq!(m.avg_wait_time_mins, 8.2);
        assert_eq!(m.occupancy_rate_pct, 67.0);
        assert_eq!(m.on_time_performance_pct, 92.1);
        assert_eq!(m.overcrowding_rate, 0.029);
    }

    #[test]
    fn test_pipeline_adjustment() {
        let mut m = Metrics::default();
        m.apply_pipeline_completion();
        assert!((m.avg_wait_time_mins - 8.2 * 0.85).abs() < 1e-9);
        assert!((m.occupancy_rate_pct - 67.0 * 1.12).abs() < 1e-9);
        assert!((m.on_time_performance_pct - 92.1 * 1.08).abs() < 1e-9);
        assert!((m.overcrowding_rate - 0.029 * 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_pipeline_adjustment_clamps() {
        let mut m = Metrics {
            avg_wait_time_mins: 0.0,
            occupancy_rate_pct: 95.0,
            on_time_performance_pct: 97.0,
            overcrowding_rate: 0.0,
        };
        m.apply_pipeline_completion();
        assert_eq!(m.avg_wait_time_mins, 0.0);
        assert_eq!(m.occupancy_rate_pct, 100.0);
        assert_eq!(m.on_time_performance_pct, 100.0);
        assert_eq!(m.overcrowding_rate, 0.0);
    }

    #[test]
    fn test_genetic_adjustment_caps_on_time_at_98() {
        let mut m = Metrics::default();
        m.apply_genetic_completion();
        assert!((m.avg_wait_time_mins - 8.2 * 0.82).abs() < 1e-9);
        assert_eq!(m.on_time_performance_pct, 98.0);
        // Untouched by the GA adjustment.
        assert_eq!(m.occupancy_rate_pct, 67.0);
        assert_eq!(m.overcrowding_rate, 0.029);
    }
}
