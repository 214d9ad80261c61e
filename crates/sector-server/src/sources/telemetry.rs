//! ADS-B telemetry over HTTP (airplanes.live-compatible point query).

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use sector_core::Aircraft;

use super::TelemetrySource;

/// Reported barometric altitude below this is treated as on the ground.
const GROUND_ALTITUDE_FT: f64 = 100.0;

pub struct AdsbTelemetrySource {
    client: Client,
    api_url: String,
    lat: f64,
    lon: f64,
    radius_nm: f64,
}

#[derive(Debug, Deserialize)]
struct PointResponse {
    #[serde(default)]
    ac: Vec<AdsbAircraft>,
}

/// One aircraft record from the feed. `alt_baro` is a number or the literal
/// string "ground".
#[derive(Debug, Deserialize)]
struct AdsbAircraft {
    #[serde(default)]
    flight: Option<String>,
    #[serde(default)]
    hex: String,
    lat: f64,
    lon: f64,
    #[serde(default)]
    alt_baro: Option<Value>,
    #[serde(default)]
    gs: Option<f64>,
    #[serde(default)]
    track: Option<f64>,
    #[serde(default)]
    baro_rate: Option<f64>,
}

impl AdsbAircraft {
    fn altitude_ft(&self) -> f64 {
        match &self.alt_baro {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    fn on_ground(&self) -> bool {
        match &self.alt_baro {
            Some(Value::String(s)) => s == "ground",
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0) < GROUND_ALTITUDE_FT,
            _ => true,
        }
    }
}

impl AdsbTelemetrySource {
    pub fn new(api_url: impl Into<String>, lat: f64, lon: f64, radius_nm: f64) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .expect("Failed to create HTTP client"),
            api_url: api_url.into(),
            lat,
            lon,
            radius_nm,
        }
    }
}

#[async_trait]
impl TelemetrySource for AdsbTelemetrySource {
    async fn fetch_aircraft(&self) -> Result<Vec<Aircraft>> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("lat", self.lat),
                ("lon", self.lon),
                ("distance", self.radius_nm),
            ])
            .send()
            .await
            .context("telemetry request failed")?
            .error_for_status()
            .context("telemetry request rejected")?;

        let parsed: PointResponse = response.json().await.context("telemetry parse failed")?;
        let now = Utc::now();

        let aircraft = parsed
            .ac
            .into_iter()
            .filter(|ac| !ac.hex.is_empty())
            .map(|ac| Aircraft {
                callsign: ac
                    .flight
                    .as_deref()
                    .map(str::trim)
                    .filter(|cs| !cs.is_empty())
                    .unwrap_or("UNKNOWN")
                    .to_string(),
                icao24: ac.hex.clone(),
                latitude: ac.lat,
                longitude: ac.lon,
                altitude_ft: ac.altitude_ft(),
                ground_speed_kts: ac.gs.unwrap_or(0.0),
                heading_deg: ac.track.unwrap_or(0.0),
                vertical_rate_fpm: ac.baro_rate.unwrap_or(0.0),
                on_ground: ac.on_ground(),
                last_contact: now,
            })
            .collect();

        Ok(aircraft)
    }
}
