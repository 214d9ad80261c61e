//! Surveillance and tasking loop.
//!
//! Once per cycle: pull telemetry and weather, scan for violations, estimate
//! workload, fold alerts into the task ledger, and enqueue transmissions for
//! alerts scored for automatic dispatch. Collaborator failures downgrade to
//! "no data" and the cycle proceeds.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::interval;

use sector_core::{
    Aircraft, Alert, TaskUpsert, ViolationDetector, WeatherSnapshot, WorkloadEstimator,
    WorkloadLevel,
};

use crate::dispatch::{Dispatcher, TransmissionRequest};
use crate::persistence::{tasks as tasks_db, Database};
use crate::phrase::{target_callsign, PhraseBook};
use crate::sources::{TelemetrySource, WeatherSource};
use crate::state::AppState;

/// Collaborators the loop pulls from each cycle.
pub struct SurveillanceDeps {
    pub telemetry: Arc<dyn TelemetrySource>,
    pub weather: Arc<dyn WeatherSource>,
    pub phrases: PhraseBook,
    pub db: Option<Database>,
}

pub async fn run_surveillance_loop(
    state: Arc<AppState>,
    dispatcher: Arc<Dispatcher>,
    deps: SurveillanceDeps,
    mut shutdown: broadcast::Receiver<()>,
) {
    let detector = ViolationDetector::new(state.config.safety_rules());
    let estimator = WorkloadEstimator::new(state.config.sector_capacity);
    let mut ticker = interval(Duration::from_secs(state.config.scan_interval_secs));

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Surveillance loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                let aircraft = match deps.telemetry.fetch_aircraft().await {
                    Ok(aircraft) => aircraft,
                    Err(err) => {
                        tracing::warn!("Telemetry fetch failed: {err:#}");
                        Vec::new()
                    }
                };

                let weather = match deps.weather.fetch_weather(&state.config.station).await {
                    Ok(weather) => weather,
                    Err(err) => {
                        tracing::warn!("Weather fetch failed: {err:#}");
                        None
                    }
                };

                state.replace_aircraft(aircraft.clone());
                state.set_weather(weather.clone());

                let alerts = process_cycle(
                    &state,
                    &dispatcher,
                    &deps.phrases,
                    &detector,
                    &estimator,
                    &aircraft,
                    weather.as_ref(),
                )
                .await;

                tracing::debug!(
                    "Cycle complete: {} aircraft, {} alert(s)",
                    aircraft.len(),
                    alerts.len()
                );

                if let Some(db) = &deps.db {
                    let snapshot = state.ledger.lock().expect("ledger lock").snapshot();
                    if let Err(err) = tasks_db::save_tasks(db.pool(), &snapshot).await {
                        tracing::warn!("Task persistence failed: {err:#}");
                    }
                }
            }
        }
    }
}

/// One detection/tasking cycle over already-fetched data.
///
/// Factored out of the loop so the pipeline can be driven directly in tests.
pub async fn process_cycle(
    state: &AppState,
    dispatcher: &Dispatcher,
    phrases: &PhraseBook,
    detector: &ViolationDetector,
    estimator: &WorkloadEstimator,
    aircraft: &[Aircraft],
    weather: Option<&WeatherSnapshot>,
) -> Vec<Alert> {
    let mut alerts = detector.scan(aircraft, weather);
    for alert in &mut alerts {
        alert.pilot_message = phrases.instruction_for(alert);
    }

    let metrics = estimator.estimate(aircraft.len(), &alerts);
    if metrics.workload_level == WorkloadLevel::Critical {
        tracing::warn!(
            "Sector workload CRITICAL: score {} with {} aircraft",
            metrics.workload_score,
            metrics.aircraft_count
        );
    }
    state.set_metrics(metrics);

    {
        let mut ledger = state.ledger.lock().expect("ledger lock");
        for alert in &alerts {
            ledger.upsert(TaskUpsert {
                entity_id: alert.primary_icao24.clone(),
                callsign: alert
                    .aircraft_involved
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "UNKNOWN".to_string()),
                priority: alert.risk.tier.into(),
                category: alert.kind.into(),
                summary: format!("{}: {}", alert.kind.as_str(), alert.description),
                description: alert.description.clone(),
                acted_instruction: Some(alert.recommended_action.clone()),
                pilot_message: alert.pilot_message.clone(),
                alert_id: Some(alert.id.clone()),
            });
        }

        let expired = ledger.expire_stale(chrono::Duration::minutes(
            state.config.task_expiry_minutes,
        ));
        if expired > 0 {
            tracing::info!("Expired {expired} stale task(s)");
        }
        ledger.purge_settled(chrono::Duration::hours(state.config.task_retention_hours));
    }

    for alert in &alerts {
        if !alert.risk.auto_dispatch {
            continue;
        }
        let Some(message) = alert.pilot_message.clone() else {
            continue;
        };

        dispatcher
            .enqueue(TransmissionRequest {
                callsign: target_callsign(alert),
                message,
                priority: alert.risk.urgency.into(),
                urgency: alert.risk.urgency,
                frequency_mhz: state.config.frequency_mhz,
                alert_id: Some(alert.id.clone()),
            })
            .await;
    }

    state.set_alerts(alerts.clone());
    alerts
}
