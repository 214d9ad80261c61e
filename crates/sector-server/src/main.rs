//! Sector Server - always-on backend for sector safety monitoring and voice dispatch

mod config;
mod dispatch;
mod loops;
mod persistence;
mod phrase;
mod sources;
mod state;
mod synth;

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::dispatch::{DispatchSettings, Dispatcher};
use crate::loops::surveillance_loop::SurveillanceDeps;
use crate::persistence::{init_database, tasks as tasks_db};
use crate::phrase::PhraseBook;
use crate::sources::{AdsbTelemetrySource, MetarWeatherSource};
use crate::state::AppState;
use crate::synth::HttpSynthesizer;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sector_server=debug".parse()?),
        )
        .init();

    tracing::info!("Starting Sector Server...");

    let config = Config::from_env();
    let state = Arc::new(AppState::new(config.clone()));

    // Optional task store: restore the ledger, then write through after each cycle
    let db = match &config.db_path {
        Some(path) => {
            let db = init_database(path, 4).await?;
            let tasks = tasks_db::load_tasks(db.pool()).await?;
            tracing::info!("Restored {} task(s) from storage", tasks.len());
            state.ledger.lock().expect("ledger lock").restore(tasks);
            Some(db)
        }
        None => {
            tracing::info!("No task store configured, running in-memory");
            None
        }
    };

    let synth = Arc::new(HttpSynthesizer::new(
        &config.synthesis_api_url,
        config.synthesis_api_key.clone(),
        &config.synthesis_voice_id,
    ));
    let dispatcher = Arc::new(Dispatcher::new(synth, DispatchSettings::from_config(&config)));

    let deps = SurveillanceDeps {
        telemetry: Arc::new(AdsbTelemetrySource::new(
            &config.adsb_api_url,
            config.station_lat,
            config.station_lon,
            config.monitoring_radius_nm,
        )),
        weather: Arc::new(MetarWeatherSource::new(
            &config.weather_api_url,
            config.weather_api_token.clone(),
        )),
        phrases: PhraseBook::new(),
        db,
    };

    let surveillance = tokio::spawn(loops::surveillance_loop::run_surveillance_loop(
        state.clone(),
        dispatcher.clone(),
        deps,
        state.shutdown_signal(),
    ));
    let dispatch = tokio::spawn(loops::dispatch_loop::run_dispatch_loop(
        dispatcher.clone(),
        state.shutdown_signal(),
    ));
    let broadcast = tokio::spawn(loops::broadcast_loop::run_broadcast_loop(
        state.clone(),
        state.shutdown_signal(),
    ));

    tracing::info!(
        "Monitoring {} every {}s on {:.1} MHz",
        state.config.station,
        state.config.scan_interval_secs,
        state.config.frequency_mhz
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    state.trigger_shutdown();

    let _ = tokio::join!(surveillance, dispatch, broadcast);
    Ok(())
}
