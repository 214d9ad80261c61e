//! Core logic for the sector safety pipeline: risk scoring, violation
//! detection, workload estimation, task deduplication, and the outbound
//! transmission queue. Pure domain logic; all I/O lives with the caller.

pub mod comms;
pub mod detect;
pub mod geo;
pub mod ledger;
pub mod models;
pub mod risk;
pub mod rules;
pub mod workload;

pub use comms::{
    verify_readback, AudioClip, ChannelMonitor, ChannelStatus, CommsError, QueueStatus,
    ReadbackAssessment, ReadbackStatus, Transmission, TransmissionPriority, TransmissionQueue,
    TransmissionStatus,
};
pub use detect::ViolationDetector;
pub use geo::{bearing_deg, haversine_nm, project_position};
pub use ledger::{
    LedgerStats, Task, TaskCategory, TaskLedger, TaskPriority, TaskStatus, TaskUpsert,
};
pub use models::{Aircraft, Alert, SectorSnapshot, ViolationKind, WeatherSnapshot};
pub use risk::{RiskFactor, RiskScore, RiskScorer, RiskTier, SeparationContext, Urgency};
pub use rules::SafetyRules;
pub use workload::{WorkloadEstimator, WorkloadLevel, WorkloadMetrics};
