//! Controller workload estimation.

use serde::{Deserialize, Serialize};

use crate::models::Alert;
use crate::risk::RiskTier;

/// Coarse workload level derived from the numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkloadLevel {
    Low,
    Moderate,
    High,
    Critical,
}

/// Workload assessment for one cycle. Recomputed fresh, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadMetrics {
    pub aircraft_count: usize,
    pub active_alerts: usize,
    pub critical_alerts: usize,
    pub high_alerts: usize,
    pub medium_alerts: usize,
    pub low_alerts: usize,

    /// 0-100
    pub workload_score: f64,
    pub workload_level: WorkloadLevel,

    pub max_safe_aircraft: usize,
    pub capacity_percentage: f64,

    /// Multiplicative extrapolations, a heuristic rather than a forecast
    pub projected_workload_15min: f64,
    pub projected_workload_30min: f64,

    pub advisories: Vec<String>,
}

/// Aggregates traffic count and alert tiers into a workload picture.
#[derive(Debug, Clone, Copy)]
pub struct WorkloadEstimator {
    /// Sector capacity in aircraft
    pub capacity: usize,
}

impl Default for WorkloadEstimator {
    fn default() -> Self {
        Self { capacity: 55 }
    }
}

impl WorkloadEstimator {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
        }
    }

    pub fn estimate(&self, aircraft_count: usize, alerts: &[Alert]) -> WorkloadMetrics {
        let critical = count_tier(alerts, RiskTier::Critical);
        let high = count_tier(alerts, RiskTier::High);
        let medium = count_tier(alerts, RiskTier::Medium);
        let low = count_tier(alerts, RiskTier::Low);

        let raw = (aircraft_count as f64 / self.capacity as f64) * 60.0
            + critical as f64 * 10.0
            + high as f64 * 5.0
            + medium as f64 * 2.0;
        let workload_score = round1(raw.min(100.0));

        let workload_level = if workload_score >= 80.0 {
            WorkloadLevel::Critical
        } else if workload_score >= 60.0 {
            WorkloadLevel::High
        } else if workload_score >= 40.0 {
            WorkloadLevel::Moderate
        } else {
            WorkloadLevel::Low
        };

        let capacity_percentage =
            round1(((aircraft_count as f64 / self.capacity as f64) * 100.0).min(100.0));

        let mut advisories = Vec::new();
        if workload_score >= 80.0 {
            advisories.push("Request additional controller support".to_string());
            advisories.push("Consider traffic management initiatives".to_string());
        }
        if critical > 0 {
            advisories.push(format!("Prioritize {critical} CRITICAL alert(s)"));
        }
        if aircraft_count > 20 {
            advisories.push("Approaching maximum safe capacity".to_string());
        }

        WorkloadMetrics {
            aircraft_count,
            active_alerts: alerts.len(),
            critical_alerts: critical,
            high_alerts: high,
            medium_alerts: medium,
            low_alerts: low,
            workload_score,
            workload_level,
            max_safe_aircraft: self.capacity,
            capacity_percentage,
            projected_workload_15min: round1((workload_score * 1.1).min(100.0)),
            projected_workload_30min: round1((workload_score * 1.2).min(100.0)),
            advisories,
        }
    }
}

fn count_tier(alerts: &[Alert], tier: RiskTier) -> usize {
    alerts.iter().filter(|a| a.risk.tier == tier).count()
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn over_capacity_traffic_is_high_workload() {
        let estimator = WorkloadEstimator::default();
        let metrics = estimator.estimate(60, &[]);
        // 60/55 * 60 = 65.45
        assert!((metrics.workload_score - 65.5).abs() < 0.1);
        assert_eq!(metrics.workload_level, WorkloadLevel::High);
        assert_eq!(metrics.capacity_percentage, 100.0);
    }

    #[test]
    fn empty_sector_is_low() {
        let estimator = WorkloadEstimator::default();
        let metrics = estimator.estimate(0, &[]);
        assert_eq!(metrics.workload_score, 0.0);
        assert_eq!(metrics.workload_level, WorkloadLevel::Low);
        assert!(metrics.advisories.is_empty());
    }

    #[test]
    fn projections_clamp_to_100() {
        let estimator = WorkloadEstimator::new(10);
        let metrics = estimator.estimate(20, &[]);
        assert_eq!(metrics.workload_score, 100.0);
        assert_eq!(metrics.projected_workload_15min, 100.0);
        assert_eq!(metrics.projected_workload_30min, 100.0);
        assert_eq!(metrics.workload_level, WorkloadLevel::Critical);
    }
}
