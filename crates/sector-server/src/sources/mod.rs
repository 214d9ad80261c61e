//! External data collaborators.
//!
//! The loops only see these traits; failures surface as errors the caller
//! downgrades to "no data" rather than halting a cycle.

use anyhow::Result;
use async_trait::async_trait;

use sector_core::{Aircraft, WeatherSnapshot};

pub mod telemetry;
pub mod weather;

pub use telemetry::AdsbTelemetrySource;
pub use weather::MetarWeatherSource;

/// Live aircraft positions around the sector. An empty result means no
/// traffic, never an error.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn fetch_aircraft(&self) -> Result<Vec<Aircraft>>;
}

/// Current observation for a station.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fetch_weather(&self, station: &str) -> Result<Option<WeatherSnapshot>>;
}
