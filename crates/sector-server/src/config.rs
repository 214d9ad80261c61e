//! Server configuration from environment.

use std::env;

use sector_core::SafetyRules;

#[derive(Debug, Clone)]
pub struct Config {
    /// Station the sector is centered on
    pub station: String,
    pub station_lat: f64,
    pub station_lon: f64,
    pub field_elevation_ft: f64,
    pub monitoring_radius_nm: f64,

    pub adsb_api_url: String,
    pub weather_api_url: String,
    pub weather_api_token: Option<String>,

    pub synthesis_api_url: String,
    pub synthesis_api_key: Option<String>,
    pub synthesis_voice_id: String,

    pub sector_capacity: usize,
    pub frequency_mhz: f64,

    pub scan_interval_secs: u64,
    pub broadcast_interval_secs: u64,

    pub task_expiry_minutes: i64,
    pub task_retention_hours: i64,

    pub ack_timeout_secs: u64,
    pub max_retries: u32,
    pub congestion_window_secs: i64,
    pub congestion_limit: usize,

    /// Path to the SQLite task store; unset runs in-memory only
    pub db_path: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            station: env_or("SECTOR_STATION", "KDEN"),
            station_lat: env_parse("SECTOR_LAT", 39.8561),
            station_lon: env_parse("SECTOR_LON", -104.6737),
            field_elevation_ft: env_parse("SECTOR_FIELD_ELEVATION_FT", 5434.0),
            monitoring_radius_nm: env_parse("SECTOR_RADIUS_NM", 40.0),

            adsb_api_url: env_or("ADSB_API_URL", "https://api.airplanes.live/v2/point"),
            weather_api_url: env_or("WEATHER_API_URL", "https://avwx.rest/api"),
            weather_api_token: env::var("WEATHER_API_TOKEN").ok().filter(|t| !t.is_empty()),

            synthesis_api_url: env_or("SYNTH_API_URL", "https://api.elevenlabs.io/v1"),
            synthesis_api_key: env::var("SYNTH_API_KEY").ok().filter(|k| !k.is_empty()),
            synthesis_voice_id: env_or("SYNTH_VOICE_ID", "pNInz6obpgDQGcFmaJgB"),

            sector_capacity: env_parse("SECTOR_CAPACITY", 55),
            frequency_mhz: env_parse("SECTOR_FREQUENCY_MHZ", 132.4),

            scan_interval_secs: env_parse("SECTOR_SCAN_INTERVAL_SECS", 15),
            broadcast_interval_secs: env_parse("SECTOR_BROADCAST_INTERVAL_SECS", 2),

            task_expiry_minutes: env_parse("SECTOR_TASK_EXPIRY_MINUTES", 10),
            task_retention_hours: env_parse("SECTOR_TASK_RETENTION_HOURS", 24),

            ack_timeout_secs: env_parse("SECTOR_ACK_TIMEOUT_SECS", 10),
            max_retries: env_parse("SECTOR_MAX_RETRIES", 2),
            congestion_window_secs: env_parse("SECTOR_CONGESTION_WINDOW_SECS", 60),
            congestion_limit: env_parse("SECTOR_CONGESTION_LIMIT", 6),

            db_path: env::var("SECTOR_DB_PATH").ok().filter(|p| !p.is_empty()),
        }
    }

    /// Detection thresholds bound to this sector's field elevation.
    pub fn safety_rules(&self) -> SafetyRules {
        SafetyRules {
            field_elevation_ft: self.field_elevation_ft,
            ..SafetyRules::default()
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
