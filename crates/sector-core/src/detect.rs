//! Violation detection over the current aircraft set and weather.
//!
//! Three independent checks run every cycle: runway incursion, pairwise
//! separation, and sector-wide weather. The detector holds no state between
//! cycles; repeated detections are merged downstream by the task ledger.

use chrono::Utc;
use uuid::Uuid;

use crate::geo::haversine_nm;
use crate::models::{Aircraft, Alert, ViolationKind, WeatherSnapshot};
use crate::risk::{RiskScorer, SeparationContext, Urgency};
use crate::rules::SafetyRules;

/// Fallback time-to-touchdown when the descent rate is too small to divide by.
const DEFAULT_TOUCHDOWN_SECS: f64 = 120.0;

/// Fallback time-to-impact for a stationary separation pair.
const DEFAULT_IMPACT_SECS: f64 = 300.0;

/// Scans the sector for safety violations.
pub struct ViolationDetector {
    rules: SafetyRules,
    scorer: RiskScorer,
}

impl Default for ViolationDetector {
    fn default() -> Self {
        Self::new(SafetyRules::default())
    }
}

impl ViolationDetector {
    pub fn new(rules: SafetyRules) -> Self {
        Self {
            rules,
            scorer: RiskScorer::new(),
        }
    }

    pub fn rules(&self) -> &SafetyRules {
        &self.rules
    }

    /// Run all checks for one cycle.
    pub fn scan(&self, aircraft: &[Aircraft], weather: Option<&WeatherSnapshot>) -> Vec<Alert> {
        let mut alerts = Vec::new();
        let current_load = aircraft.len();

        if let Some(alert) = self.detect_runway_incursion(aircraft, weather, current_load) {
            alerts.push(alert);
        }

        alerts.extend(self.detect_separation_violations(aircraft, current_load));

        if let Some(wx) = weather {
            if let Some(alert) = self.detect_weather_risk(aircraft, wx, current_load) {
                alerts.push(alert);
            }
        }

        alerts
    }

    /// One alert per cycle when the surface and the final-approach sets overlap.
    fn detect_runway_incursion(
        &self,
        aircraft: &[Aircraft],
        weather: Option<&WeatherSnapshot>,
        current_load: usize,
    ) -> Option<Alert> {
        let on_surface = aircraft
            .iter()
            .find(|ac| ac.on_ground && ac.ground_speed_kts < self.rules.surface_speed_max_kts)?;
        let on_final = aircraft.iter().find(|ac| {
            !ac.on_ground
                && ac.altitude_agl_ft(self.rules.field_elevation_ft)
                    < self.rules.final_approach_ceiling_ft
                && ac.vertical_rate_fpm < self.rules.approach_descent_rate_fpm
        })?;

        let altitude_agl = on_final.altitude_agl_ft(self.rules.field_elevation_ft);
        let descent_fps = on_final.vertical_rate_fpm.abs() / 60.0;
        let time_to_touchdown = if descent_fps > 0.1 {
            altitude_agl / descent_fps
        } else {
            DEFAULT_TOUCHDOWN_SECS
        };

        let separation_nm = haversine_nm(
            on_surface.latitude,
            on_surface.longitude,
            on_final.latitude,
            on_final.longitude,
        );

        let risk = self.scorer.score(
            ViolationKind::RunwayIncursion,
            2,
            weather,
            current_load,
            &SeparationContext {
                horizontal_nm: Some(separation_nm),
                vertical_ft: None,
                time_to_impact_s: Some(time_to_touchdown),
            },
        );

        let recommended_action = match risk.urgency {
            Urgency::Immediate => format!(
                "Instruct {} to go around immediately, {:.0}s to touchdown",
                on_final.callsign, time_to_touchdown
            ),
            Urgency::Urgent => format!(
                "Expedite runway vacation by {} or instruct go-around",
                on_surface.callsign
            ),
            _ => format!("Monitor and expedite {} as needed", on_surface.callsign),
        };

        Some(Alert {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            kind: ViolationKind::RunwayIncursion,
            aircraft_involved: vec![on_surface.callsign.clone(), on_final.callsign.clone()],
            primary_icao24: on_surface.icao24.clone(),
            description: format!(
                "Runway incursion risk: {} on runway, {} {:.0}ft AGL on approach",
                on_surface.callsign, on_final.callsign, altitude_agl
            ),
            recommended_action,
            pilot_message: None,
            current_separation_nm: Some(separation_nm),
            risk,
        })
    }

    /// One alert per violating pair. A pair violates only when both the
    /// horizontal and the vertical minima are breached at once.
    fn detect_separation_violations(
        &self,
        aircraft: &[Aircraft],
        current_load: usize,
    ) -> Vec<Alert> {
        let mut alerts = Vec::new();

        for (i, first) in aircraft.iter().enumerate() {
            for second in &aircraft[i + 1..] {
                let horizontal_nm = haversine_nm(
                    first.latitude,
                    first.longitude,
                    second.latitude,
                    second.longitude,
                );
                let vertical_ft = (first.altitude_ft - second.altitude_ft).abs();

                if horizontal_nm >= self.rules.separation_minimum_nm
                    || vertical_ft >= self.rules.separation_minimum_ft
                {
                    continue;
                }

                // First-order closing estimate from the pair's mean speed.
                let mean_speed_nm_per_s =
                    (first.ground_speed_kts + second.ground_speed_kts) / 2.0 / 3600.0;
                let time_to_impact = if mean_speed_nm_per_s > 0.0 {
                    horizontal_nm / mean_speed_nm_per_s
                } else {
                    DEFAULT_IMPACT_SECS
                };

                let risk = self.scorer.score(
                    ViolationKind::Separation,
                    2,
                    None,
                    current_load,
                    &SeparationContext {
                        horizontal_nm: Some(horizontal_nm),
                        vertical_ft: Some(vertical_ft),
                        time_to_impact_s: Some(time_to_impact),
                    },
                );

                let recommended_action = match risk.tier {
                    crate::risk::RiskTier::Critical => format!(
                        "Immediately climb {} or turn {} for separation",
                        first.callsign, second.callsign
                    ),
                    crate::risk::RiskTier::High => format!(
                        "Increase separation: climb {} or turn {}",
                        first.callsign, second.callsign
                    ),
                    _ => format!(
                        "Monitor separation between {} and {}",
                        first.callsign, second.callsign
                    ),
                };

                alerts.push(Alert {
                    id: Uuid::new_v4().to_string(),
                    created_at: Utc::now(),
                    kind: ViolationKind::Separation,
                    aircraft_involved: vec![first.callsign.clone(), second.callsign.clone()],
                    primary_icao24: first.icao24.clone(),
                    description: format!(
                        "Separation violation: {:.1}nm horizontal, {:.0}ft vertical",
                        horizontal_nm, vertical_ft
                    ),
                    recommended_action,
                    pilot_message: None,
                    current_separation_nm: Some(horizontal_nm),
                    risk,
                });
            }
        }

        alerts
    }

    /// Single sector-wide alert on low visibility.
    fn detect_weather_risk(
        &self,
        aircraft: &[Aircraft],
        weather: &WeatherSnapshot,
        current_load: usize,
    ) -> Option<Alert> {
        if weather.visibility_sm >= self.rules.weather_visibility_minimum_sm {
            return None;
        }

        let risk = self.scorer.score(
            ViolationKind::Weather,
            aircraft.len(),
            Some(weather),
            current_load,
            &SeparationContext::default(),
        );

        let conditions = if weather.visibility_sm < 1.0 {
            "visibility below one statute mile"
        } else {
            "low visibility"
        };
        let phenomena = if weather.phenomena.is_empty() {
            conditions.to_string()
        } else {
            weather.phenomena.join(", ")
        };

        Some(Alert {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            kind: ViolationKind::Weather,
            // Cap the roster; a sector-wide alert doesn't need every callsign
            aircraft_involved: aircraft
                .iter()
                .take(10)
                .map(|ac| ac.callsign.clone())
                .collect(),
            primary_icao24: weather.station.clone(),
            description: format!(
                "Adverse weather: {}SM visibility, {}",
                weather.visibility_sm, phenomena
            ),
            recommended_action:
                "Increase separation standards, advise pilots of conditions, consider instrument approaches"
                    .to_string(),
            pilot_message: None,
            current_separation_nm: None,
            risk,
        })
    }
}
