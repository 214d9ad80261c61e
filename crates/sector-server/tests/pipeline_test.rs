//! End-to-end pipeline tests over synthetic traffic: detection feeds the
//! ledger, workload metrics, the snapshot feed, and auto-dispatch.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use sector_core::{
    Aircraft, TaskStatus, ViolationDetector, ViolationKind, WeatherSnapshot, WorkloadEstimator,
};
use sector_server::config::Config;
use sector_server::dispatch::{DispatchSettings, Dispatcher};
use sector_server::loops::surveillance_loop::process_cycle;
use sector_server::phrase::PhraseBook;
use sector_server::state::AppState;
use sector_server::synth::SilentSynthesizer;

fn test_config() -> Config {
    Config {
        station: "KDEN".to_string(),
        station_lat: 39.8561,
        station_lon: -104.6737,
        field_elevation_ft: 0.0,
        monitoring_radius_nm: 40.0,
        adsb_api_url: String::new(),
        weather_api_url: String::new(),
        weather_api_token: None,
        synthesis_api_url: String::new(),
        synthesis_api_key: None,
        synthesis_voice_id: String::new(),
        sector_capacity: 55,
        frequency_mhz: 132.4,
        scan_interval_secs: 15,
        broadcast_interval_secs: 2,
        task_expiry_minutes: 10,
        task_retention_hours: 24,
        ack_timeout_secs: 1,
        max_retries: 2,
        congestion_window_secs: 60,
        congestion_limit: 100,
        db_path: None,
    }
}

fn harness() -> (Arc<AppState>, Arc<Dispatcher>, ViolationDetector, WorkloadEstimator) {
    let config = test_config();
    let state = Arc::new(AppState::new(config.clone()));
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(SilentSynthesizer),
        DispatchSettings {
            ack_timeout: Duration::from_millis(50),
            max_retries: config.max_retries,
            congestion_window: chrono::Duration::seconds(60),
            congestion_limit: config.congestion_limit,
        },
    ));
    let detector = ViolationDetector::new(config.safety_rules());
    let estimator = WorkloadEstimator::new(config.sector_capacity);
    (state, dispatcher, detector, estimator)
}

fn aircraft(callsign: &str, icao24: &str, lat: f64, lon: f64, altitude_ft: f64) -> Aircraft {
    Aircraft {
        callsign: callsign.to_string(),
        icao24: icao24.to_string(),
        latitude: lat,
        longitude: lon,
        altitude_ft,
        ground_speed_kts: 250.0,
        heading_deg: 90.0,
        vertical_rate_fpm: 0.0,
        on_ground: false,
        last_contact: Utc::now(),
    }
}

/// Two aircraft ~2nm apart with a 500ft vertical gap.
fn converging_pair() -> Vec<Aircraft> {
    vec![
        aircraft("UAL123", "a1b2c3", 39.85, -104.67, 10_000.0),
        aircraft("DAL456", "d4e5f6", 39.85, -104.6266, 10_500.0),
    ]
}

#[tokio::test]
async fn separation_alert_becomes_one_task_across_cycles() {
    let (state, dispatcher, detector, estimator) = harness();
    let phrases = PhraseBook::new();
    let fleet = converging_pair();

    let alerts = process_cycle(
        &state,
        &dispatcher,
        &phrases,
        &detector,
        &estimator,
        &fleet,
        None,
    )
    .await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, ViolationKind::Separation);

    // Same traffic next cycle refreshes the task instead of duplicating it
    process_cycle(
        &state,
        &dispatcher,
        &phrases,
        &detector,
        &estimator,
        &fleet,
        None,
    )
    .await;

    let ledger = state.ledger.lock().unwrap();
    let active = ledger.list_active(true);
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].status, TaskStatus::Active);
    assert_eq!(active[0].entity_id, "a1b2c3");
}

#[tokio::test]
async fn critical_incursion_auto_dispatches_an_emergency() {
    let (state, dispatcher, detector, estimator) = harness();
    let phrases = PhraseBook::new();

    let mut on_surface = aircraft("SWA789", "aa1122", 39.8561, -104.6737, 0.0);
    on_surface.on_ground = true;
    on_surface.ground_speed_kts = 12.0;

    // 500ft AGL descending 1000fpm: 30 seconds out
    let mut on_final = aircraft("UAL123", "bb3344", 39.8601, -104.6737, 500.0);
    on_final.vertical_rate_fpm = -1000.0;
    on_final.ground_speed_kts = 140.0;

    let weather = WeatherSnapshot {
        station: "KDEN".to_string(),
        observation_time: Utc::now(),
        visibility_sm: 0.5,
        ceiling_ft: Some(100),
        wind_speed_kts: 30.0,
        wind_direction_deg: 270.0,
        phenomena: vec!["FG".to_string()],
        temperature_c: 1.0,
        dewpoint_c: 1.0,
        altimeter_inhg: 29.92,
        raw_metar: String::new(),
    };

    let alerts = process_cycle(
        &state,
        &dispatcher,
        &phrases,
        &detector,
        &estimator,
        &[on_surface, on_final],
        Some(&weather),
    )
    .await;

    let incursion = alerts
        .iter()
        .find(|a| a.kind == ViolationKind::RunwayIncursion)
        .expect("incursion alert");
    assert!(incursion.risk.auto_dispatch, "score {}", incursion.risk.score);
    assert!(incursion.pilot_message.is_some());

    let status = dispatcher.queue_status();
    assert!(status.emergency_count >= 1, "queue: {status:?}");
}

#[tokio::test]
async fn snapshot_feed_carries_the_latest_picture() {
    let (state, dispatcher, detector, estimator) = harness();
    let phrases = PhraseBook::new();
    let fleet = converging_pair();

    let mut subscriber = state.subscribe_snapshots();

    state.replace_aircraft(fleet.clone());
    process_cycle(
        &state,
        &dispatcher,
        &phrases,
        &detector,
        &estimator,
        &fleet,
        None,
    )
    .await;

    let snapshot = state.publish_snapshot();
    assert_eq!(snapshot.aircraft.len(), 2);
    assert_eq!(snapshot.alerts.len(), 1);
    let workload = snapshot.workload.expect("metrics for the cycle");
    assert_eq!(workload.aircraft_count, 2);

    let received = subscriber.try_recv().expect("published snapshot");
    assert_eq!(received.alerts.len(), 1);
}

#[tokio::test]
async fn empty_sector_cycle_is_clean() {
    let (state, dispatcher, detector, estimator) = harness();
    let phrases = PhraseBook::new();

    let alerts = process_cycle(
        &state,
        &dispatcher,
        &phrases,
        &detector,
        &estimator,
        &[],
        None,
    )
    .await;

    assert!(alerts.is_empty());
    assert_eq!(state.ledger.lock().unwrap().list_active(true).len(), 0);
    assert_eq!(dispatcher.queue_status().queue_length, 0);
    let metrics = state.metrics().expect("metrics still recorded");
    assert_eq!(metrics.workload_score, 0.0);
}
