//! Safety rules and thresholds for sector monitoring.

use serde::{Deserialize, Serialize};

/// Detection thresholds. One instance is built from configuration at startup
/// and injected everywhere it is needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyRules {
    /// Minimum horizontal separation in nautical miles
    pub separation_minimum_nm: f64,
    /// Minimum vertical separation in feet
    pub separation_minimum_ft: f64,
    /// Visibility below this (statute miles) raises a weather alert
    pub weather_visibility_minimum_sm: f64,
    /// Ground speed below this counts as "slow on the surface" (knots)
    pub surface_speed_max_kts: f64,
    /// Airborne aircraft below this AGL altitude are considered on final (feet)
    pub final_approach_ceiling_ft: f64,
    /// Descent faster than this counts as an approach (feet per minute, negative)
    pub approach_descent_rate_fpm: f64,
    /// Field elevation used to derive AGL altitudes (feet MSL)
    pub field_elevation_ft: f64,
}

impl Default for SafetyRules {
    fn default() -> Self {
        Self {
            separation_minimum_nm: 3.0,
            separation_minimum_ft: 1000.0,
            weather_visibility_minimum_sm: 3.0,
            surface_speed_max_kts: 30.0,
            final_approach_ceiling_ft: 2500.0,
            approach_descent_rate_fpm: -500.0,
            field_elevation_ft: 0.0,
        }
    }
}
