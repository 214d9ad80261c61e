//! Multi-factor risk scoring.
//!
//! Each violation is scored 0-100 from four weighted components:
//! historical frequency (0.4), severity (0.3), time urgency (0.2), and
//! environmental conditions (0.1). The score maps to a tier, a voice urgency,
//! and a required action time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ViolationKind, WeatherSnapshot};

/// Risk tier classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskTier {
    /// 90-100: act within 60 seconds
    Critical,
    /// 70-89: act within 3 minutes
    High,
    /// 50-69: monitor closely
    Medium,
    /// <50: awareness only
    Low,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Critical => "CRITICAL",
            RiskTier::High => "HIGH",
            RiskTier::Medium => "MEDIUM",
            RiskTier::Low => "LOW",
        }
    }
}

/// Voice-delivery urgency, separate from the tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Urgency {
    Immediate,
    Urgent,
    Routine,
    Advisory,
}

/// Separation and timing context for a scoring call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeparationContext {
    pub horizontal_nm: Option<f64>,
    pub vertical_ft: Option<f64>,
    pub time_to_impact_s: Option<f64>,
}

/// Comprehensive risk score with component breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskScore {
    /// Overall score, 0-100
    pub score: f64,
    pub tier: RiskTier,
    pub urgency: Urgency,

    // Components, each in [0, 1]
    pub historical_frequency: f64,
    pub severity: f64,
    pub time_urgency: f64,
    pub environmental: f64,

    /// Required action time for the tier, in seconds
    pub action_time_seconds: u32,
    /// Dispatch a transmission without waiting for controller action
    pub auto_dispatch: bool,
    /// Raise the audible alarm
    pub requires_alarm: bool,

    /// Accident-report cases on record for this violation kind
    pub case_count: u32,
    /// Share of serious incidents involving this kind, in percent
    pub incident_percentage: f64,

    pub calculated_at: DateTime<Utc>,
}

/// One weighted factor of a risk score, for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFactor {
    pub name: String,
    pub value: f64,
    pub weight: f64,
    pub contribution: f64,
    pub description: String,
}

impl RiskScore {
    /// Break the score down into its weighted factors.
    pub fn factors(&self, kind: ViolationKind) -> Vec<RiskFactor> {
        vec![
            RiskFactor {
                name: "Historical frequency".into(),
                value: self.historical_frequency,
                weight: 0.4,
                contribution: self.historical_frequency * 40.0,
                description: format!(
                    "{:.1}% of serious incidents involve {}",
                    self.incident_percentage,
                    kind.as_str().to_lowercase().replace('_', " ")
                ),
            },
            RiskFactor {
                name: "Incident severity".into(),
                value: self.severity,
                weight: 0.3,
                contribution: self.severity * 30.0,
                description: severity_description(self.severity).into(),
            },
            RiskFactor {
                name: "Time criticality".into(),
                value: self.time_urgency,
                weight: 0.2,
                contribution: self.time_urgency * 20.0,
                description: urgency_description(self.time_urgency).into(),
            },
            RiskFactor {
                name: "Environmental conditions".into(),
                value: self.environmental,
                weight: 0.1,
                contribution: self.environmental * 10.0,
                description: environmental_description(self.environmental).into(),
            },
        ]
    }
}

fn severity_description(severity: f64) -> &'static str {
    if severity >= 0.8 {
        "Extremely high potential for catastrophic outcome"
    } else if severity >= 0.6 {
        "High potential for serious incident"
    } else if severity >= 0.4 {
        "Moderate potential for incident"
    } else {
        "Lower severity, monitoring recommended"
    }
}

fn urgency_description(urgency: f64) -> &'static str {
    if urgency >= 0.9 {
        "Immediate action required"
    } else if urgency >= 0.7 {
        "Urgent action required within minutes"
    } else if urgency >= 0.5 {
        "Timely action recommended"
    } else {
        "Monitor and address when practical"
    }
}

fn environmental_description(environmental: f64) -> &'static str {
    if environmental >= 0.7 {
        "Challenging conditions significantly increasing risk"
    } else if environmental >= 0.5 {
        "Adverse conditions contributing to risk"
    } else if environmental >= 0.3 {
        "Some environmental factors present"
    } else {
        "Favorable conditions"
    }
}

/// Historical occurrence rate and case count per violation kind, seeded from
/// accident-report statistics. Not recomputed from live data.
fn historical_stats(kind: ViolationKind) -> (f64, u32) {
    match kind {
        ViolationKind::RunwayIncursion => (0.85, 342),
        ViolationKind::Separation => (0.72, 287),
        ViolationKind::Weather => (0.63, 256),
        ViolationKind::Other => (0.5, 0),
    }
}

fn is_high_severity_kind(kind: ViolationKind) -> bool {
    matches!(
        kind,
        ViolationKind::RunwayIncursion | ViolationKind::Separation
    )
}

/// Pure, deterministic scoring engine. No I/O, no cross-call state.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskScorer;

impl RiskScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score one violation.
    ///
    /// `participants` is the number of aircraft involved; `current_load` the
    /// total aircraft count in the sector.
    pub fn score(
        &self,
        kind: ViolationKind,
        participants: usize,
        weather: Option<&WeatherSnapshot>,
        current_load: usize,
        ctx: &SeparationContext,
    ) -> RiskScore {
        let (historical_frequency, case_count) = historical_stats(kind);
        let severity = self.severity_component(kind, participants, ctx);
        let time_urgency = self.time_urgency_component(kind, ctx.time_to_impact_s);
        let environmental = self.environmental_component(weather, current_load);

        let score = historical_frequency * 40.0
            + severity * 30.0
            + time_urgency * 20.0
            + environmental * 10.0;
        let score = (score * 10.0).round() / 10.0;

        let tier = tier_for(score);
        RiskScore {
            score,
            tier,
            urgency: urgency_for(score, time_urgency),
            historical_frequency,
            severity,
            time_urgency,
            environmental,
            action_time_seconds: action_time_for(tier),
            auto_dispatch: score >= 90.0,
            requires_alarm: score >= 70.0,
            case_count,
            incident_percentage: (historical_frequency * 1000.0).round() / 10.0,
            calculated_at: Utc::now(),
        }
    }

    fn severity_component(
        &self,
        kind: ViolationKind,
        participants: usize,
        ctx: &SeparationContext,
    ) -> f64 {
        let mut severity: f64 = 0.5;

        if participants >= 3 {
            severity += 0.2;
        } else if participants == 2 {
            severity += 0.1;
        }

        if let Some(horizontal_nm) = ctx.horizontal_nm {
            if horizontal_nm < 1.0 {
                severity += 0.3;
            } else if horizontal_nm < 2.0 {
                severity += 0.2;
            } else if horizontal_nm < 3.0 {
                severity += 0.1;
            }
        }

        if let Some(vertical_ft) = ctx.vertical_ft {
            if vertical_ft < 500.0 {
                severity += 0.3;
            } else if vertical_ft < 1000.0 {
                severity += 0.2;
            } else if vertical_ft < 1500.0 {
                severity += 0.1;
            }
        }

        if is_high_severity_kind(kind) {
            severity += 0.2;
        }

        severity.min(1.0)
    }

    fn time_urgency_component(&self, kind: ViolationKind, time_to_impact_s: Option<f64>) -> f64 {
        let Some(time_to_impact) = time_to_impact_s else {
            return if is_high_severity_kind(kind) { 0.8 } else { 0.5 };
        };

        if time_to_impact <= 30.0 {
            1.0
        } else if time_to_impact <= 60.0 {
            0.9
        } else if time_to_impact <= 120.0 {
            0.7
        } else if time_to_impact <= 300.0 {
            0.5
        } else {
            0.3
        }
    }

    fn environmental_component(
        &self,
        weather: Option<&WeatherSnapshot>,
        current_load: usize,
    ) -> f64 {
        let mut environmental: f64 = 0.3;

        if let Some(wx) = weather {
            if wx.visibility_sm < 3.0 {
                environmental += 0.3;
            } else if wx.visibility_sm < 5.0 {
                environmental += 0.2;
            }

            if wx.wind_speed_kts > 25.0 {
                environmental += 0.2;
            } else if wx.wind_speed_kts > 15.0 {
                environmental += 0.1;
            }

            if wx.has_adverse_phenomena() {
                environmental += 0.2;
            }
        }

        if current_load > 20 {
            environmental += 0.3;
        } else if current_load > 15 {
            environmental += 0.2;
        } else if current_load > 10 {
            environmental += 0.1;
        }

        environmental.min(1.0)
    }
}

fn tier_for(score: f64) -> RiskTier {
    if score >= 90.0 {
        RiskTier::Critical
    } else if score >= 70.0 {
        RiskTier::High
    } else if score >= 50.0 {
        RiskTier::Medium
    } else {
        RiskTier::Low
    }
}

fn urgency_for(score: f64, time_urgency: f64) -> Urgency {
    if score >= 90.0 || time_urgency >= 0.9 {
        Urgency::Immediate
    } else if score >= 70.0 || time_urgency >= 0.7 {
        Urgency::Urgent
    } else if score >= 50.0 {
        Urgency::Routine
    } else {
        Urgency::Advisory
    }
}

fn action_time_for(tier: RiskTier) -> u32 {
    match tier {
        RiskTier::Critical => 60,
        RiskTier::High => 180,
        RiskTier::Medium => 600,
        RiskTier::Low => 1800,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn low_visibility_weather() -> WeatherSnapshot {
        WeatherSnapshot {
            station: "KDEN".into(),
            observation_time: Utc::now(),
            visibility_sm: 0.5,
            ceiling_ft: Some(200),
            wind_speed_kts: 28.0,
            wind_direction_deg: 270.0,
            phenomena: vec!["FG".into()],
            temperature_c: 2.0,
            dewpoint_c: 2.0,
            altimeter_inhg: 29.92,
            raw_metar: String::new(),
        }
    }

    #[test]
    fn score_stays_in_range() {
        let scorer = RiskScorer::new();
        let ctx = SeparationContext {
            horizontal_nm: Some(0.4),
            vertical_ft: Some(200.0),
            time_to_impact_s: Some(15.0),
        };
        let score = scorer.score(
            ViolationKind::RunwayIncursion,
            3,
            Some(&low_visibility_weather()),
            25,
            &ctx,
        );
        assert!(score.score <= 100.0);
        assert!(score.score >= 0.0);
        assert_eq!(score.tier, RiskTier::Critical);
        assert_eq!(score.urgency, Urgency::Immediate);
        assert!(score.auto_dispatch);
        assert!(score.requires_alarm);
        assert_eq!(score.action_time_seconds, 60);
    }

    #[test]
    fn tier_and_urgency_track_score() {
        let scorer = RiskScorer::new();
        let score = scorer.score(
            ViolationKind::Weather,
            0,
            None,
            2,
            &SeparationContext::default(),
        );
        // 0.63*40 + 0.5*30 + 0.5*20 + 0.3*10 = 53.2
        assert!((score.score - 53.2).abs() < 0.05, "got {}", score.score);
        assert_eq!(score.tier, RiskTier::Medium);
        assert_eq!(score.urgency, Urgency::Routine);
        assert!(!score.auto_dispatch);
        assert!(!score.requires_alarm);
    }

    #[test]
    fn unknown_kind_gets_midrange_frequency() {
        let scorer = RiskScorer::new();
        let score = scorer.score(
            ViolationKind::Other,
            0,
            None,
            0,
            &SeparationContext::default(),
        );
        assert!((score.historical_frequency - 0.5).abs() < f64::EPSILON);
        assert_eq!(score.case_count, 0);
    }

    #[test]
    fn components_are_capped() {
        let scorer = RiskScorer::new();
        let ctx = SeparationContext {
            horizontal_nm: Some(0.1),
            vertical_ft: Some(100.0),
            time_to_impact_s: Some(5.0),
        };
        let score = scorer.score(
            ViolationKind::Separation,
            5,
            Some(&low_visibility_weather()),
            30,
            &ctx,
        );
        assert!(score.severity <= 1.0);
        assert!(score.environmental <= 1.0);
        assert!((score.time_urgency - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn factor_contributions_sum_to_score() {
        let scorer = RiskScorer::new();
        let ctx = SeparationContext {
            horizontal_nm: Some(2.1),
            vertical_ft: Some(500.0),
            time_to_impact_s: Some(90.0),
        };
        let score = scorer.score(ViolationKind::Separation, 2, None, 12, &ctx);
        let total: f64 = score
            .factors(ViolationKind::Separation)
            .iter()
            .map(|f| f.contribution)
            .sum();
        assert!((total - score.score).abs() < 0.1, "{total} vs {}", score.score);
    }

    #[test]
    fn time_urgency_steps() {
        let scorer = RiskScorer::new();
        let urgency = |t: f64| {
            scorer
                .score(
                    ViolationKind::Other,
                    0,
                    None,
                    0,
                    &SeparationContext {
                        time_to_impact_s: Some(t),
                        ..Default::default()
                    },
                )
                .time_urgency
        };
        assert_eq!(urgency(20.0), 1.0);
        assert_eq!(urgency(45.0), 0.9);
        assert_eq!(urgency(100.0), 0.7);
        assert_eq!(urgency(250.0), 0.5);
        assert_eq!(urgency(600.0), 0.3);
    }
}
