//! In-memory shared state for the background loops.

use std::sync::{Mutex, RwLock};

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::broadcast;

use sector_core::{Aircraft, Alert, SectorSnapshot, TaskLedger, WeatherSnapshot, WorkloadMetrics};

use crate::config::Config;

const SNAPSHOT_CHANNEL_CAPACITY: usize = 32;

/// Application state shared by the three loops.
///
/// The aircraft table is keyed by transponder address and replaced wholesale
/// each surveillance cycle. The task ledger is the only component other loops
/// mutate; its mutex is held only across a single upsert/expire call.
pub struct AppState {
    pub config: Config,

    aircraft: DashMap<String, Aircraft>,
    weather: RwLock<Option<WeatherSnapshot>>,
    alerts: RwLock<Vec<Alert>>,
    metrics: RwLock<Option<WorkloadMetrics>>,

    pub ledger: Mutex<TaskLedger>,

    snapshot_tx: broadcast::Sender<SectorSnapshot>,
    shutdown_tx: broadcast::Sender<()>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let (snapshot_tx, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            aircraft: DashMap::new(),
            weather: RwLock::new(None),
            alerts: RwLock::new(Vec::new()),
            metrics: RwLock::new(None),
            ledger: Mutex::new(TaskLedger::new()),
            snapshot_tx,
            shutdown_tx,
        }
    }

    /// Replace the aircraft table with this cycle's surveillance picture.
    pub fn replace_aircraft(&self, aircraft: Vec<Aircraft>) {
        self.aircraft.clear();
        for ac in aircraft {
            self.aircraft.insert(ac.icao24.clone(), ac);
        }
    }

    pub fn aircraft_list(&self) -> Vec<Aircraft> {
        self.aircraft.iter().map(|r| r.value().clone()).collect()
    }

    pub fn aircraft_count(&self) -> usize {
        self.aircraft.len()
    }

    pub fn set_weather(&self, weather: Option<WeatherSnapshot>) {
        *self.weather.write().expect("weather lock") = weather;
    }

    pub fn weather(&self) -> Option<WeatherSnapshot> {
        self.weather.read().expect("weather lock").clone()
    }

    pub fn set_alerts(&self, alerts: Vec<Alert>) {
        *self.alerts.write().expect("alerts lock") = alerts;
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.read().expect("alerts lock").clone()
    }

    pub fn set_metrics(&self, metrics: WorkloadMetrics) {
        *self.metrics.write().expect("metrics lock") = Some(metrics);
    }

    pub fn metrics(&self) -> Option<WorkloadMetrics> {
        self.metrics.read().expect("metrics lock").clone()
    }

    /// Subscribe to the periodic sector snapshot feed.
    pub fn subscribe_snapshots(&self) -> broadcast::Receiver<SectorSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Assemble and publish the current snapshot. Lagging or absent
    /// subscribers are not an error.
    pub fn publish_snapshot(&self) -> SectorSnapshot {
        let snapshot = SectorSnapshot {
            timestamp: Utc::now(),
            aircraft: self.aircraft_list(),
            alerts: self.alerts(),
            weather: self.weather(),
            workload: self.metrics(),
        };
        let _ = self.snapshot_tx.send(snapshot.clone());
        snapshot
    }

    pub fn shutdown_signal(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn trigger_shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}
