//! Clearance phrasing for alerts.
//!
//! Phrasing variety belongs here, not in the detection core: scanning the
//! same sector twice yields identical alerts, while the instruction text may
//! differ between transmissions.

use rand::seq::IndexedRandom;
use rand::Rng;

use sector_core::{Alert, Urgency, ViolationKind};

/// The aircraft a transmission for this alert is addressed to.
///
/// For a runway incursion the arrival acts; for a separation conflict the
/// first participant; weather advisories go to everyone on frequency.
pub fn target_callsign(alert: &Alert) -> String {
    match alert.kind {
        ViolationKind::RunwayIncursion => alert
            .aircraft_involved
            .get(1)
            .or_else(|| alert.aircraft_involved.first())
            .cloned()
            .unwrap_or_else(|| "UNKNOWN".to_string()),
        ViolationKind::Weather => "ALL STATIONS".to_string(),
        _ => alert
            .aircraft_involved
            .first()
            .cloned()
            .unwrap_or_else(|| "UNKNOWN".to_string()),
    }
}

pub struct PhraseBook;

impl Default for PhraseBook {
    fn default() -> Self {
        Self
    }
}

impl PhraseBook {
    pub fn new() -> Self {
        Self
    }

    /// Instruction text for an alert, addressed to the aircraft that has to
    /// act. None when the alert doesn't warrant a transmission.
    pub fn instruction_for(&self, alert: &Alert) -> Option<String> {
        match alert.kind {
            ViolationKind::RunwayIncursion => self.runway_incursion(alert),
            ViolationKind::Separation => self.separation(alert),
            ViolationKind::Weather => self.weather(alert),
            ViolationKind::Other => None,
        }
    }

    fn runway_incursion(&self, alert: &Alert) -> Option<String> {
        // Second participant is the aircraft on final
        let on_final = alert.aircraft_involved.get(1)?;
        let on_surface = alert.aircraft_involved.first()?;

        let mut rng = rand::rng();
        match alert.risk.urgency {
            Urgency::Immediate => {
                let templates = [
                    format!("{on_final}, go around, traffic on the runway"),
                    format!("{on_final}, go around immediately, runway occupied"),
                ];
                templates.choose(&mut rng).cloned()
            }
            Urgency::Urgent => Some(format!(
                "{on_final}, continue approach, expect late landing clearance, traffic vacating"
            )),
            _ => Some(format!("{on_surface}, expedite vacating the runway")),
        }
    }

    fn separation(&self, alert: &Alert) -> Option<String> {
        let first = alert.aircraft_involved.first()?;
        let second = alert.aircraft_involved.get(1)?;

        let mut rng = rand::rng();
        match alert.risk.urgency {
            Urgency::Immediate => {
                let templates = [
                    format!("{first}, climb immediately, traffic alert"),
                    format!("{first}, traffic alert, climb and maintain two thousand feet higher"),
                ];
                templates.choose(&mut rng).cloned()
            }
            Urgency::Urgent => {
                let turn_dir = ["left", "right"].choose(&mut rng)?.to_string();
                let degrees = rng.random_range(2..5) * 10;
                let templates = [
                    format!("{first}, turn {turn_dir} heading {degrees} degrees for traffic"),
                    format!("{first}, climb and maintain one thousand feet higher, traffic {second}"),
                    format!("{first}, reduce speed two one zero knots for spacing"),
                ];
                templates.choose(&mut rng).cloned()
            }
            _ => Some(format!("{first}, traffic advisory, monitor separation")),
        }
    }

    fn weather(&self, alert: &Alert) -> Option<String> {
        if alert.risk.tier == sector_core::RiskTier::Low {
            return None;
        }
        Some(format!(
            "All aircraft, be advised, {}",
            alert.description.to_lowercase()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sector_core::{RiskScorer, SeparationContext};

    fn alert_with(kind: ViolationKind, involved: Vec<&str>, time_to_impact: f64) -> Alert {
        let risk = RiskScorer::new().score(
            kind,
            involved.len(),
            None,
            5,
            &SeparationContext {
                horizontal_nm: Some(1.5),
                vertical_ft: Some(400.0),
                time_to_impact_s: Some(time_to_impact),
            },
        );
        Alert {
            id: "a-1".into(),
            created_at: Utc::now(),
            kind,
            aircraft_involved: involved.iter().map(|s| s.to_string()).collect(),
            primary_icao24: "a1b2c3".into(),
            description: "Separation violation: 1.5nm horizontal, 400ft vertical".into(),
            recommended_action: String::new(),
            pilot_message: None,
            current_separation_nm: Some(1.5),
            risk,
        }
    }

    #[test]
    fn incursion_instruction_addresses_the_arrival() {
        let alert = alert_with(
            ViolationKind::RunwayIncursion,
            vec!["SWA789", "UAL123"],
            20.0,
        );
        let phrase = PhraseBook::new().instruction_for(&alert).unwrap();
        assert!(phrase.starts_with("UAL123"));
    }

    #[test]
    fn missing_participants_yield_no_instruction() {
        let alert = alert_with(ViolationKind::Separation, vec!["UAL123"], 20.0);
        assert!(PhraseBook::new().instruction_for(&alert).is_none());
    }
}
