//! METAR observations over HTTP (AVWX-compatible API).

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use sector_core::WeatherSnapshot;

use super::WeatherSource;

pub struct MetarWeatherSource {
    client: Client,
    api_url: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MetarResponse {
    #[serde(default)]
    time: Option<MetarTime>,
    #[serde(default)]
    visibility: Option<MetarValue>,
    #[serde(default)]
    clouds: Vec<MetarCloud>,
    #[serde(default)]
    wx_codes: Vec<MetarCode>,
    #[serde(default)]
    wind_speed: Option<MetarValue>,
    #[serde(default)]
    wind_direction: Option<MetarValue>,
    #[serde(default)]
    temperature: Option<MetarValue>,
    #[serde(default)]
    dewpoint: Option<MetarValue>,
    #[serde(default)]
    altimeter: Option<MetarValue>,
    #[serde(default)]
    raw: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MetarTime {
    dt: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct MetarValue {
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct MetarCloud {
    #[serde(rename = "type", default)]
    cover: String,
    #[serde(default)]
    altitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct MetarCode {
    #[serde(default)]
    repr: String,
}

fn value_or(field: &Option<MetarValue>, default: f64) -> f64 {
    field.as_ref().and_then(|v| v.value).unwrap_or(default)
}

/// Lowest broken or overcast layer, in feet.
fn ceiling_ft(clouds: &[MetarCloud]) -> Option<i32> {
    clouds
        .iter()
        .filter(|c| c.cover == "BKN" || c.cover == "OVC")
        .filter_map(|c| c.altitude)
        .map(|hundreds| (hundreds * 100.0) as i32)
        .min()
}

impl MetarWeatherSource {
    pub fn new(api_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to create HTTP client"),
            api_url: api_url.into(),
            token,
        }
    }
}

#[async_trait]
impl WeatherSource for MetarWeatherSource {
    async fn fetch_weather(&self, station: &str) -> Result<Option<WeatherSnapshot>> {
        let mut request = self
            .client
            .get(format!("{}/metar/{}", self.api_url, station));
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("BEARER {token}"));
        }

        let response = request
            .send()
            .await
            .context("weather request failed")?
            .error_for_status()
            .context("weather request rejected")?;

        let parsed: MetarResponse = response.json().await.context("weather parse failed")?;

        let observation_time = match parsed.time.and_then(|t| t.dt) {
            Some(dt) => dt,
            None => Utc::now(),
        };

        Ok(Some(WeatherSnapshot {
            station: station.to_string(),
            observation_time,
            visibility_sm: value_or(&parsed.visibility, 10.0),
            ceiling_ft: ceiling_ft(&parsed.clouds),
            wind_speed_kts: value_or(&parsed.wind_speed, 0.0),
            wind_direction_deg: value_or(&parsed.wind_direction, 0.0),
            phenomena: parsed
                .wx_codes
                .into_iter()
                .map(|c| c.repr)
                .filter(|r| !r.is_empty())
                .collect(),
            temperature_c: value_or(&parsed.temperature, 0.0),
            dewpoint_c: value_or(&parsed.dewpoint, 0.0),
            altimeter_inhg: value_or(&parsed.altimeter, 29.92),
            raw_metar: parsed.raw.unwrap_or_default(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_metar_fields() {
        let raw = serde_json::json!({
            "time": {"dt": "2026-01-10T12:53:00Z"},
            "visibility": {"value": 0.5},
            "clouds": [
                {"type": "FEW", "altitude": 5.0},
                {"type": "OVC", "altitude": 2.0}
            ],
            "wx_codes": [{"repr": "FG"}],
            "wind_speed": {"value": 8.0},
            "wind_direction": {"value": 270.0},
            "temperature": {"value": 1.0},
            "dewpoint": {"value": 1.0},
            "altimeter": {"value": 30.02},
            "raw": "KDEN 101253Z 27008KT 1/2SM FG OVC002 01/01 A3002"
        });
        let parsed: MetarResponse = serde_json::from_value(raw).unwrap();

        assert_eq!(value_or(&parsed.visibility, 10.0), 0.5);
        assert_eq!(ceiling_ft(&parsed.clouds), Some(200));
        assert_eq!(parsed.wx_codes[0].repr, "FG");
    }

    #[test]
    fn empty_report_falls_back_to_defaults() {
        let parsed: MetarResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(value_or(&parsed.visibility, 10.0), 10.0);
        assert_eq!(ceiling_ft(&parsed.clouds), None);
    }
}
