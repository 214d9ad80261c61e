//! Core data models for the sector safety pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::risk::RiskScore;
use crate::workload::WorkloadMetrics;

/// Real-time aircraft state from the surveillance feed.
///
/// Overwritten wholesale each cycle; the transponder address is the only
/// cross-cycle identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aircraft {
    pub callsign: String,
    /// 24-bit transponder address (hex string)
    pub icao24: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_ft: f64,
    #[serde(default)]
    pub ground_speed_kts: f64,
    #[serde(default)]
    pub heading_deg: f64,
    #[serde(default)]
    pub vertical_rate_fpm: f64,
    #[serde(default)]
    pub on_ground: bool,
    pub last_contact: DateTime<Utc>,
}

impl Aircraft {
    /// Altitude above ground level for a given field elevation.
    pub fn altitude_agl_ft(&self, field_elevation_ft: f64) -> f64 {
        (self.altitude_ft - field_elevation_ft).max(0.0)
    }
}

/// Parsed METAR observation, immutable once produced for a cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub station: String,
    pub observation_time: DateTime<Utc>,
    pub visibility_sm: f64,
    pub ceiling_ft: Option<i32>,
    pub wind_speed_kts: f64,
    pub wind_direction_deg: f64,
    /// Present weather codes (FG, TS, SN, ...)
    #[serde(default)]
    pub phenomena: Vec<String>,
    pub temperature_c: f64,
    pub dewpoint_c: f64,
    pub altimeter_inhg: f64,
    #[serde(default)]
    pub raw_metar: String,
}

impl WeatherSnapshot {
    /// True when any significant adverse phenomenon is reported.
    pub fn has_adverse_phenomena(&self) -> bool {
        const ADVERSE: [&str; 3] = ["TS", "SN", "FG"];
        self.phenomena
            .iter()
            .any(|wx| ADVERSE.iter().any(|code| wx.contains(code)))
    }
}

/// Category of a detected safety violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationKind {
    RunwayIncursion,
    Separation,
    Weather,
    /// Anything the scorer is asked about that the detector doesn't emit.
    Other,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::RunwayIncursion => "RUNWAY_INCURSION",
            ViolationKind::Separation => "SEPARATION",
            ViolationKind::Weather => "WEATHER",
            ViolationKind::Other => "OTHER",
        }
    }
}

/// One detected violation for one cycle, with its risk assessment.
///
/// Immutable once created; cross-cycle merging is the task ledger's job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub kind: ViolationKind,
    /// Callsigns of the aircraft involved
    pub aircraft_involved: Vec<String>,
    /// Transponder address of the primary aircraft, used for task fingerprinting
    pub primary_icao24: String,
    pub description: String,
    pub recommended_action: String,
    /// Instruction text to transmit, filled in by the phrase collaborator
    #[serde(default)]
    pub pilot_message: Option<String>,
    /// Horizontal separation at detection time, where applicable
    pub current_separation_nm: Option<f64>,
    pub risk: RiskScore,
}

/// Point-in-time view of the sector pushed to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorSnapshot {
    pub timestamp: DateTime<Utc>,
    pub aircraft: Vec<Aircraft>,
    pub alerts: Vec<Alert>,
    pub weather: Option<WeatherSnapshot>,
    pub workload: Option<WorkloadMetrics>,
}
