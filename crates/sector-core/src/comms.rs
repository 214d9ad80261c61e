//! Outbound transmission queue and readback verification.
//!
//! Transmissions move through a fixed state machine:
//! QUEUED -> TRANSMITTING -> TRANSMITTED -> {CONFIRMED | INCORRECT | NO_RESPONSE}.
//! NO_RESPONSE re-enters QUEUED at the head of its priority band while retries
//! remain, then terminates as FAILED. The queue itself is pure bookkeeping;
//! audio synthesis and the acknowledgment wait live with the caller.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::risk::Urgency;

#[derive(Debug, Error)]
pub enum CommsError {
    #[error("transmission {0} not found")]
    UnknownTransmission(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransmissionPriority {
    /// Interrupts everything, bypasses congestion control
    Emergency,
    /// Interrupts routine traffic
    Critical,
    Routine,
    Advisory,
}

impl TransmissionPriority {
    /// Lower rank dispatches first.
    fn rank(&self) -> u8 {
        match self {
            TransmissionPriority::Emergency => 0,
            TransmissionPriority::Critical => 1,
            TransmissionPriority::Routine => 2,
            TransmissionPriority::Advisory => 3,
        }
    }
}

impl From<Urgency> for TransmissionPriority {
    fn from(urgency: Urgency) -> Self {
        match urgency {
            Urgency::Immediate => TransmissionPriority::Emergency,
            Urgency::Urgent => TransmissionPriority::Critical,
            Urgency::Routine => TransmissionPriority::Routine,
            Urgency::Advisory => TransmissionPriority::Advisory,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransmissionStatus {
    Queued,
    Transmitting,
    Transmitted,
    Confirmed,
    Incorrect,
    NoResponse,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReadbackStatus {
    Pending,
    Correct,
    Incorrect,
    Timeout,
}

/// Synthesized audio attached to a transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioClip {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub duration_ms: u64,
}

/// One outbound radio transmission, owned by the dispatch queue from enqueue
/// to terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transmission {
    pub id: String,
    pub callsign: String,
    pub message: String,
    pub priority: TransmissionPriority,
    pub urgency: Urgency,
    /// Target channel
    pub frequency_mhz: f64,

    pub created_at: DateTime<Utc>,
    pub queued_at: DateTime<Utc>,
    pub transmitted_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,

    pub status: TransmissionStatus,
    pub readback_status: ReadbackStatus,

    pub audio: Option<AudioClip>,
    pub actual_readback: Option<String>,

    pub retry_count: u32,
    pub max_retries: u32,

    pub alert_id: Option<String>,
}

/// Estimated airtime when no audio is attached.
const DEFAULT_AIRTIME_MS: u64 = 2000;

impl Transmission {
    pub fn airtime_ms(&self) -> u64 {
        self.audio
            .as_ref()
            .map(|clip| clip.duration_ms)
            .unwrap_or(DEFAULT_AIRTIME_MS)
    }
}

/// Per-channel status snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelStatus {
    pub frequency_mhz: f64,
    pub transmissions_in_window: usize,
    pub is_congested: bool,
    /// 0 = clear, 1 = saturated
    pub congestion_level: f64,
}

/// Sliding-window transmission counter per channel.
///
/// A channel is congested when the recent send count reaches the limit;
/// EMERGENCY traffic ignores this entirely.
#[derive(Debug)]
pub struct ChannelMonitor {
    window: Duration,
    congestion_limit: usize,
    recent: HashMap<u64, VecDeque<DateTime<Utc>>>,
}

impl Default for ChannelMonitor {
    fn default() -> Self {
        Self::new(Duration::seconds(60), 6)
    }
}

/// Channels are keyed by kHz so the map key stays hashable.
fn channel_key(frequency_mhz: f64) -> u64 {
    (frequency_mhz * 1000.0).round() as u64
}

impl ChannelMonitor {
    pub fn new(window: Duration, congestion_limit: usize) -> Self {
        Self {
            window,
            congestion_limit: congestion_limit.max(1),
            recent: HashMap::new(),
        }
    }

    pub fn record_transmission(&mut self, frequency_mhz: f64, at: DateTime<Utc>) {
        self.recent
            .entry(channel_key(frequency_mhz))
            .or_default()
            .push_back(at);
    }

    fn prune(&mut self, frequency_mhz: f64, now: DateTime<Utc>) -> usize {
        let threshold = now - self.window;
        let Some(entries) = self.recent.get_mut(&channel_key(frequency_mhz)) else {
            return 0;
        };
        while entries.front().is_some_and(|t| *t < threshold) {
            entries.pop_front();
        }
        entries.len()
    }

    pub fn is_congested(&mut self, frequency_mhz: f64, now: DateTime<Utc>) -> bool {
        self.prune(frequency_mhz, now) >= self.congestion_limit
    }

    pub fn status(&mut self, frequency_mhz: f64, now: DateTime<Utc>) -> ChannelStatus {
        let in_window = self.prune(frequency_mhz, now);
        ChannelStatus {
            frequency_mhz,
            transmissions_in_window: in_window,
            is_congested: in_window >= self.congestion_limit,
            congestion_level: (in_window as f64 / self.congestion_limit as f64).min(1.0),
        }
    }
}

/// Queue status report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStatus {
    pub queue_length: usize,
    pub emergency_count: usize,
    pub critical_count: usize,
    pub routine_count: usize,
    pub advisory_count: usize,
    pub estimated_total_airtime_ms: u64,
    pub warnings: Vec<String>,
}

/// Priority-ordered transmission queue with congestion admission control.
///
/// Strict priority across bands, FIFO within a band. The head blocks while
/// its channel is congested unless it is an EMERGENCY item.
#[derive(Debug, Default)]
pub struct TransmissionQueue {
    items: Vec<Transmission>,
    monitor: ChannelMonitor,
}

impl TransmissionQueue {
    pub fn new(monitor: ChannelMonitor) -> Self {
        Self {
            items: Vec::new(),
            monitor,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Insert behind every queued item of equal or higher priority.
    pub fn push(&mut self, transmission: Transmission) {
        let rank = transmission.priority.rank();
        let pos = self
            .items
            .iter()
            .position(|t| t.priority.rank() > rank)
            .unwrap_or(self.items.len());
        self.items.insert(pos, transmission);
    }

    /// Re-insert a retried item at the head of its priority band.
    pub fn requeue_front(&mut self, transmission: Transmission) {
        let rank = transmission.priority.rank();
        let pos = self
            .items
            .iter()
            .position(|t| t.priority.rank() >= rank)
            .unwrap_or(self.items.len());
        self.items.insert(pos, transmission);
    }

    /// Pop the next dispatchable item, honoring congestion on its channel.
    ///
    /// Returns None when the queue is empty or the head must wait for its
    /// channel to clear.
    pub fn pop_next(&mut self, now: DateTime<Utc>) -> Option<Transmission> {
        let head = self.items.first()?;
        if head.priority != TransmissionPriority::Emergency
            && self.monitor.is_congested(head.frequency_mhz, now)
        {
            return None;
        }
        Some(self.items.remove(0))
    }

    /// Record a completed send so the channel's congestion window sees it.
    pub fn note_transmitted(&mut self, frequency_mhz: f64, at: DateTime<Utc>) {
        self.monitor.record_transmission(frequency_mhz, at);
    }

    pub fn channel_status(&mut self, frequency_mhz: f64, now: DateTime<Utc>) -> ChannelStatus {
        self.monitor.status(frequency_mhz, now)
    }

    pub fn status(&self) -> QueueStatus {
        let count =
            |p: TransmissionPriority| self.items.iter().filter(|t| t.priority == p).count();
        let emergency_count = count(TransmissionPriority::Emergency);

        let mut warnings = Vec::new();
        if emergency_count > 0 {
            warnings.push(format!("{emergency_count} EMERGENCY transmission(s) in queue"));
        }
        if self.items.len() > 10 {
            warnings.push("Queue backlog, high transmission volume".to_string());
        }

        QueueStatus {
            queue_length: self.items.len(),
            emergency_count,
            critical_count: count(TransmissionPriority::Critical),
            routine_count: count(TransmissionPriority::Routine),
            advisory_count: count(TransmissionPriority::Advisory),
            estimated_total_airtime_ms: self.items.iter().map(|t| t.airtime_ms()).sum(),
            warnings,
        }
    }
}

/// Result of comparing a pilot readback against the transmitted clearance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadbackAssessment {
    pub is_correct: bool,
    /// Token-overlap confidence, 0-1
    pub confidence: f64,
    pub transmitted: String,
    pub readback: String,
    pub discrepancies: Vec<String>,
    /// A safety-critical field (altitude, flight level) was read back wrong
    pub critical_error: bool,
}

/// Compare a readback against the transmitted message.
///
/// Numeric values tied to altitude or heading keywords are compared
/// positionally; an altitude mismatch is always a critical error. Everything
/// else contributes to a token-overlap confidence.
pub fn verify_readback(transmitted: &str, readback: &str) -> ReadbackAssessment {
    let tx_tokens = tokenize(transmitted);
    let rb_tokens = tokenize(readback);

    let mut discrepancies = Vec::new();
    let mut critical_error = false;

    let tx_altitudes = keyword_numbers(&tx_tokens, &["level", "altitude", "maintain"]);
    let rb_altitudes = keyword_numbers(&rb_tokens, &["level", "altitude", "maintain"]);
    for expected in &tx_altitudes {
        if rb_altitudes.is_empty() {
            discrepancies.push(format!("Altitude {expected} missing from readback"));
        } else if !rb_altitudes.contains(expected) {
            discrepancies.push(format!(
                "Altitude mismatch: transmitted {expected}, read back {}",
                rb_altitudes.join("/")
            ));
            critical_error = true;
        }
    }

    let tx_headings = keyword_numbers(&tx_tokens, &["heading"]);
    let rb_headings = keyword_numbers(&rb_tokens, &["heading"]);
    for expected in &tx_headings {
        if !rb_headings.is_empty() && !rb_headings.contains(expected) {
            discrepancies.push(format!(
                "Heading mismatch: transmitted {expected}, read back {}",
                rb_headings.join("/")
            ));
        }
    }

    let confidence = token_overlap(&tx_tokens, &rb_tokens);
    let is_correct = discrepancies.is_empty() && confidence >= 0.3;
    if discrepancies.is_empty() && !is_correct {
        discrepancies.push("Readback does not match transmission".to_string());
    }

    ReadbackAssessment {
        is_correct,
        confidence,
        transmitted: transmitted.to_string(),
        readback: readback.to_string(),
        discrepancies,
        critical_error,
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Numeric tokens within two positions after any of the given keywords.
fn keyword_numbers(tokens: &[String], keywords: &[&str]) -> Vec<String> {
    let mut numbers = Vec::new();
    for (idx, token) in tokens.iter().enumerate() {
        if !keywords.contains(&token.as_str()) {
            continue;
        }
        for follow in tokens.iter().skip(idx + 1).take(2) {
            if follow.chars().all(|c| c.is_ascii_digit()) {
                numbers.push(follow.clone());
                break;
            }
        }
    }
    numbers
}

fn token_overlap(tx_tokens: &[String], rb_tokens: &[String]) -> f64 {
    if tx_tokens.is_empty() {
        return 0.0;
    }
    let shared = tx_tokens.iter().filter(|t| rb_tokens.contains(t)).count();
    shared as f64 / tx_tokens.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transmission(id: &str, priority: TransmissionPriority) -> Transmission {
        let now = Utc::now();
        Transmission {
            id: id.into(),
            callsign: "UAL123".into(),
            message: "test message".into(),
            priority,
            urgency: Urgency::Routine,
            frequency_mhz: 132.4,
            created_at: now,
            queued_at: now,
            transmitted_at: None,
            confirmed_at: None,
            status: TransmissionStatus::Queued,
            readback_status: ReadbackStatus::Pending,
            audio: None,
            actual_readback: None,
            retry_count: 0,
            max_retries: 2,
            alert_id: None,
        }
    }

    #[test]
    fn emergency_jumps_the_queue() {
        let mut queue = TransmissionQueue::default();
        queue.push(transmission("adv", TransmissionPriority::Advisory));
        queue.push(transmission("emg", TransmissionPriority::Emergency));

        let first = queue.pop_next(Utc::now()).unwrap();
        assert_eq!(first.id, "emg");
        let second = queue.pop_next(Utc::now()).unwrap();
        assert_eq!(second.id, "adv");
    }

    #[test]
    fn fifo_within_a_band() {
        let mut queue = TransmissionQueue::default();
        queue.push(transmission("r1", TransmissionPriority::Routine));
        queue.push(transmission("r2", TransmissionPriority::Routine));
        queue.push(transmission("c1", TransmissionPriority::Critical));
        queue.push(transmission("r3", TransmissionPriority::Routine));

        let order: Vec<String> = std::iter::from_fn(|| queue.pop_next(Utc::now()))
            .map(|t| t.id)
            .collect();
        assert_eq!(order, vec!["c1", "r1", "r2", "r3"]);
    }

    #[test]
    fn requeue_lands_at_band_head() {
        let mut queue = TransmissionQueue::default();
        queue.push(transmission("e1", TransmissionPriority::Emergency));
        queue.push(transmission("r1", TransmissionPriority::Routine));
        queue.push(transmission("r2", TransmissionPriority::Routine));

        queue.requeue_front(transmission("retry", TransmissionPriority::Routine));

        let order: Vec<String> = std::iter::from_fn(|| queue.pop_next(Utc::now()))
            .map(|t| t.id)
            .collect();
        assert_eq!(order, vec!["e1", "retry", "r1", "r2"]);
    }

    #[test]
    fn congested_channel_defers_routine_but_not_emergency() {
        let now = Utc::now();
        let mut queue = TransmissionQueue::new(ChannelMonitor::new(Duration::seconds(60), 3));
        for _ in 0..3 {
            queue.note_transmitted(132.4, now);
        }

        queue.push(transmission("r1", TransmissionPriority::Routine));
        assert!(queue.pop_next(now).is_none());
        assert_eq!(queue.len(), 1);

        queue.push(transmission("e1", TransmissionPriority::Emergency));
        let popped = queue.pop_next(now).unwrap();
        assert_eq!(popped.id, "e1");
    }

    #[test]
    fn congestion_window_slides() {
        let now = Utc::now();
        let mut monitor = ChannelMonitor::new(Duration::seconds(60), 2);
        monitor.record_transmission(121.9, now - Duration::seconds(90));
        monitor.record_transmission(121.9, now - Duration::seconds(30));
        assert!(!monitor.is_congested(121.9, now));

        monitor.record_transmission(121.9, now - Duration::seconds(5));
        assert!(monitor.is_congested(121.9, now));

        let status = monitor.status(121.9, now);
        assert_eq!(status.transmissions_in_window, 2);
        assert!((status.congestion_level - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn queue_status_counts_bands() {
        let mut queue = TransmissionQueue::default();
        queue.push(transmission("e1", TransmissionPriority::Emergency));
        queue.push(transmission("r1", TransmissionPriority::Routine));
        queue.push(transmission("a1", TransmissionPriority::Advisory));

        let status = queue.status();
        assert_eq!(status.queue_length, 3);
        assert_eq!(status.emergency_count, 1);
        assert_eq!(status.routine_count, 1);
        assert_eq!(status.advisory_count, 1);
        assert_eq!(status.estimated_total_airtime_ms, 6000);
        assert_eq!(status.warnings.len(), 1);
    }

    #[test]
    fn correct_readback_confirms() {
        let result = verify_readback(
            "United one twenty three, descend and maintain flight level 240",
            "Descend and maintain flight level 240, United one twenty three",
        );
        assert!(result.is_correct);
        assert!(!result.critical_error);
        assert!(result.discrepancies.is_empty());
    }

    #[test]
    fn altitude_mismatch_is_critical() {
        let result = verify_readback(
            "Descend and maintain flight level 240",
            "Down to flight level 340",
        );
        assert!(!result.is_correct);
        assert!(result.critical_error);
        assert!(result.discrepancies[0].contains("240"));
    }

    #[test]
    fn heading_mismatch_flags_but_is_not_critical() {
        let result = verify_readback(
            "Turn left heading 280 for traffic",
            "Left heading 290",
        );
        assert!(!result.is_correct);
        assert!(!result.critical_error);
    }

    #[test]
    fn unrelated_readback_is_rejected() {
        let result = verify_readback(
            "Reduce speed to 210 knots",
            "Say again",
        );
        assert!(!result.is_correct);
    }
}
