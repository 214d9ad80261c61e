//! Outbound transmission dispatch.
//!
//! Wraps the core transmission queue with audio synthesis, the
//! send -> await-readback -> retry cycle, and acknowledgment bookkeeping.
//! The queue mutex is held only to pop or push; the readback wait runs on a
//! per-transmission notifier with no locks held.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Notify;
use tokio::time::timeout;
use uuid::Uuid;

use sector_core::{
    verify_readback, ChannelMonitor, ChannelStatus, CommsError, QueueStatus, ReadbackAssessment,
    ReadbackStatus, Transmission, TransmissionPriority, TransmissionQueue, TransmissionStatus,
    Urgency,
};

use crate::config::Config;
use crate::synth::SpeechSynthesizer;

/// Cap on simulated airtime so a bad duration estimate can't stall the loop.
const MAX_AIRTIME_MS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub ack_timeout: Duration,
    pub max_retries: u32,
    pub congestion_window: chrono::Duration,
    pub congestion_limit: usize,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            ack_timeout: Duration::from_secs(10),
            max_retries: 2,
            congestion_window: chrono::Duration::seconds(60),
            congestion_limit: 6,
        }
    }
}

impl DispatchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            ack_timeout: Duration::from_secs(config.ack_timeout_secs),
            max_retries: config.max_retries,
            congestion_window: chrono::Duration::seconds(config.congestion_window_secs),
            congestion_limit: config.congestion_limit,
        }
    }
}

/// One enqueue call.
#[derive(Debug, Clone)]
pub struct TransmissionRequest {
    pub callsign: String,
    pub message: String,
    pub priority: TransmissionPriority,
    pub urgency: Urgency,
    pub frequency_mhz: f64,
    pub alert_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchStats {
    pub confirmed: u64,
    pub incorrect: u64,
    pub failed: u64,
}

/// Owns every transmission from enqueue to terminal state.
pub struct Dispatcher {
    queue: Mutex<TransmissionQueue>,
    /// Transmitted, awaiting readback
    active: DashMap<String, Transmission>,
    /// Terminal states kept for lookup
    completed: DashMap<String, Transmission>,
    acks: DashMap<String, Arc<Notify>>,

    synth: Arc<dyn SpeechSynthesizer>,
    settings: DispatchSettings,

    confirmed_count: AtomicU64,
    incorrect_count: AtomicU64,
    failed_count: AtomicU64,
}

impl Dispatcher {
    pub fn new(synth: Arc<dyn SpeechSynthesizer>, settings: DispatchSettings) -> Self {
        let monitor = ChannelMonitor::new(settings.congestion_window, settings.congestion_limit);
        Self {
            queue: Mutex::new(TransmissionQueue::new(monitor)),
            active: DashMap::new(),
            completed: DashMap::new(),
            acks: DashMap::new(),
            synth,
            settings,
            confirmed_count: AtomicU64::new(0),
            incorrect_count: AtomicU64::new(0),
            failed_count: AtomicU64::new(0),
        }
    }

    /// Synthesize audio and queue the transmission. Synthesis failure
    /// downgrades to a silent transmission.
    pub async fn enqueue(&self, request: TransmissionRequest) -> Transmission {
        let audio = match self
            .synth
            .synthesize(&request.message, request.urgency)
            .await
        {
            Ok(audio) => audio,
            Err(err) => {
                tracing::warn!("Synthesis failed for {}: {err:#}", request.callsign);
                None
            }
        };

        let now = Utc::now();
        let transmission = Transmission {
            id: Uuid::new_v4().to_string(),
            callsign: request.callsign,
            message: request.message,
            priority: request.priority,
            urgency: request.urgency,
            frequency_mhz: request.frequency_mhz,
            created_at: now,
            queued_at: now,
            transmitted_at: None,
            confirmed_at: None,
            status: TransmissionStatus::Queued,
            readback_status: ReadbackStatus::Pending,
            audio,
            actual_readback: None,
            retry_count: 0,
            max_retries: self.settings.max_retries,
            alert_id: request.alert_id,
        };

        self.queue
            .lock()
            .expect("queue lock")
            .push(transmission.clone());

        tracing::info!(
            "Queued {:?} transmission {} for {}",
            transmission.priority,
            transmission.id,
            transmission.callsign
        );
        transmission
    }

    /// Dispatch the next eligible transmission and drive it to acknowledgment
    /// or retry. Returns false when nothing was dispatchable.
    pub async fn drive_next(&self) -> bool {
        let next = self.queue.lock().expect("queue lock").pop_next(Utc::now());
        let Some(transmission) = next else {
            return false;
        };
        self.transmit(transmission).await;
        true
    }

    async fn transmit(&self, mut transmission: Transmission) {
        transmission.status = TransmissionStatus::Transmitting;
        transmission.transmitted_at = Some(Utc::now());
        tracing::info!(
            "Transmitting to {}: '{}'",
            transmission.callsign,
            transmission.message
        );

        // Hold the channel for the clip's airtime
        if let Some(clip) = &transmission.audio {
            tokio::time::sleep(Duration::from_millis(clip.duration_ms.min(MAX_AIRTIME_MS))).await;
        }

        transmission.status = TransmissionStatus::Transmitted;
        let id = transmission.id.clone();
        let notify = Arc::new(Notify::new());
        self.acks.insert(id.clone(), notify.clone());
        self.queue
            .lock()
            .expect("queue lock")
            .note_transmitted(transmission.frequency_mhz, Utc::now());
        self.active.insert(id.clone(), transmission);

        // Wait for the readback with no locks held
        let acknowledged = timeout(self.settings.ack_timeout, notify.notified())
            .await
            .is_ok();
        self.acks.remove(&id);

        if acknowledged {
            // submit_readback already settled the transmission
            return;
        }

        // Readback may still have landed between the timeout and here
        let Some((_, mut stored)) = self.active.remove(&id) else {
            return;
        };

        stored.status = TransmissionStatus::NoResponse;
        stored.readback_status = ReadbackStatus::Timeout;
        tracing::warn!("No readback from {} for {}", stored.callsign, id);

        if stored.retry_count < stored.max_retries {
            stored.retry_count += 1;
            stored.status = TransmissionStatus::Queued;
            stored.readback_status = ReadbackStatus::Pending;
            tracing::info!(
                "Retrying transmission {} ({}/{})",
                id,
                stored.retry_count,
                stored.max_retries
            );
            self.queue.lock().expect("queue lock").requeue_front(stored);
        } else {
            stored.status = TransmissionStatus::Failed;
            self.failed_count.fetch_add(1, Ordering::Relaxed);
            tracing::error!(
                "Transmission {} to {} failed after {} retries",
                id,
                stored.callsign,
                stored.max_retries
            );
            self.completed.insert(id, stored);
        }
    }

    /// Verify a pilot readback against an awaiting transmission.
    ///
    /// A critical mismatch forces INCORRECT regardless of overall similarity.
    pub fn submit_readback(
        &self,
        transmission_id: &str,
        readback: &str,
    ) -> Result<ReadbackAssessment, CommsError> {
        let Some((_, mut transmission)) = self.active.remove(transmission_id) else {
            return Err(CommsError::UnknownTransmission(transmission_id.to_string()));
        };

        let assessment = verify_readback(&transmission.message, readback);
        transmission.actual_readback = Some(readback.to_string());

        if assessment.is_correct && !assessment.critical_error {
            transmission.status = TransmissionStatus::Confirmed;
            transmission.readback_status = ReadbackStatus::Correct;
            transmission.confirmed_at = Some(Utc::now());
            self.confirmed_count.fetch_add(1, Ordering::Relaxed);
        } else {
            transmission.status = TransmissionStatus::Incorrect;
            transmission.readback_status = ReadbackStatus::Incorrect;
            self.incorrect_count.fetch_add(1, Ordering::Relaxed);
            if assessment.critical_error {
                tracing::error!(
                    "Critical readback error from {}: {:?}",
                    transmission.callsign,
                    assessment.discrepancies
                );
            }
        }

        self.completed
            .insert(transmission.id.clone(), transmission);

        if let Some((_, notify)) = self.acks.remove(transmission_id) {
            notify.notify_one();
        }

        Ok(assessment)
    }

    /// Look up a transmission awaiting readback or in a terminal state.
    pub fn lookup(&self, transmission_id: &str) -> Option<Transmission> {
        self.active
            .get(transmission_id)
            .map(|t| t.clone())
            .or_else(|| self.completed.get(transmission_id).map(|t| t.clone()))
    }

    pub fn queue_status(&self) -> QueueStatus {
        self.queue.lock().expect("queue lock").status()
    }

    pub fn channel_status(&self, frequency_mhz: f64) -> ChannelStatus {
        self.queue
            .lock()
            .expect("queue lock")
            .channel_status(frequency_mhz, Utc::now())
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            confirmed: self.confirmed_count.load(Ordering::Relaxed),
            incorrect: self.incorrect_count.load(Ordering::Relaxed),
            failed: self.failed_count.load(Ordering::Relaxed),
        }
    }
}
