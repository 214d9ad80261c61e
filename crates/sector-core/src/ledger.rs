//! Task ledger: converts repeated detections into deduplicated, expiring tasks.
//!
//! The ledger is the single authoritative owner of the task table. Upserts
//! are keyed by a fingerprint of (entity, category, priority), so the same
//! ongoing situation refreshes one task instead of creating duplicates.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ViolationKind;
use crate::risk::RiskTier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskPriority {
    High,
    Medium,
    Low,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::High => "HIGH",
            TaskPriority::Medium => "MEDIUM",
            TaskPriority::Low => "LOW",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            TaskPriority::High => 0,
            TaskPriority::Medium => 1,
            TaskPriority::Low => 2,
        }
    }
}

impl From<RiskTier> for TaskPriority {
    fn from(tier: RiskTier) -> Self {
        match tier {
            RiskTier::Critical | RiskTier::High => TaskPriority::High,
            RiskTier::Medium => TaskPriority::Medium,
            RiskTier::Low => TaskPriority::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskCategory {
    Runway,
    Separation,
    Weather,
    Altitude,
    Speed,
    Heading,
    Conflict,
    Communication,
    Other,
}

impl TaskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::Runway => "RUNWAY",
            TaskCategory::Separation => "SEPARATION",
            TaskCategory::Weather => "WEATHER",
            TaskCategory::Altitude => "ALTITUDE",
            TaskCategory::Speed => "SPEED",
            TaskCategory::Heading => "HEADING",
            TaskCategory::Conflict => "CONFLICT",
            TaskCategory::Communication => "COMMUNICATION",
            TaskCategory::Other => "OTHER",
        }
    }
}

impl From<ViolationKind> for TaskCategory {
    fn from(kind: ViolationKind) -> Self {
        match kind {
            ViolationKind::RunwayIncursion => TaskCategory::Runway,
            ViolationKind::Separation => TaskCategory::Separation,
            ViolationKind::Weather => TaskCategory::Weather,
            ViolationKind::Other => TaskCategory::Conflict,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Active,
    /// Explicitly acknowledged by the controller
    Resolved,
    /// Not re-detected within the staleness window
    Expired,
}

/// Single actionable task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub entity_id: String,
    pub callsign: String,
    pub priority: TaskPriority,
    pub category: TaskCategory,
    pub status: TaskStatus,
    pub summary: String,
    pub description: String,
    /// Instruction already taken or queued for this task
    pub acted_instruction: Option<String>,
    /// Exact phraseology to transmit
    pub pilot_message: Option<String>,
    pub fingerprint: String,
    /// Monotonic creation order, for stable priority ties
    #[serde(default)]
    pub seq: u64,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub alert_id: Option<String>,
}

/// Fields for one upsert call.
#[derive(Debug, Clone)]
pub struct TaskUpsert {
    pub entity_id: String,
    pub callsign: String,
    pub priority: TaskPriority,
    pub category: TaskCategory,
    pub summary: String,
    pub description: String,
    pub acted_instruction: Option<String>,
    pub pilot_message: Option<String>,
    pub alert_id: Option<String>,
}

/// Counts by status and priority.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerStats {
    pub total: usize,
    pub active: usize,
    pub high_priority: usize,
    pub medium_priority: usize,
    pub low_priority: usize,
    pub resolved: usize,
    pub expired: usize,
}

fn fingerprint(entity_id: &str, category: TaskCategory, priority: TaskPriority) -> String {
    format!("{}_{}_{}", entity_id, category.as_str(), priority.as_str())
}

/// In-memory task table. Persistence, if any, is a side effect the caller
/// performs after mutations.
#[derive(Debug, Default)]
pub struct TaskLedger {
    tasks: HashMap<String, Task>,
    next_seq: u64,
}

impl TaskLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a task, or refresh the ACTIVE task with the same fingerprint.
    ///
    /// Idempotent under repeated identical input: the task id is stable and
    /// only `last_seen` and the content fields move.
    pub fn upsert(&mut self, upsert: TaskUpsert) -> Task {
        let fp = fingerprint(&upsert.entity_id, upsert.category, upsert.priority);
        let now = Utc::now();

        let existing_id = self
            .tasks
            .values()
            .find(|t| t.fingerprint == fp && t.status == TaskStatus::Active)
            .map(|t| t.id.clone());

        if let Some(id) = existing_id {
            let task = self.tasks.get_mut(&id).expect("id from live scan");
            task.last_seen = now;
            task.summary = upsert.summary;
            task.description = upsert.description;
            if upsert.acted_instruction.is_some() {
                task.acted_instruction = upsert.acted_instruction;
            }
            if upsert.pilot_message.is_some() {
                task.pilot_message = upsert.pilot_message;
            }
            if upsert.alert_id.is_some() {
                task.alert_id = upsert.alert_id;
            }
            return task.clone();
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        let task = Task {
            id: Uuid::new_v4().to_string(),
            entity_id: upsert.entity_id,
            callsign: upsert.callsign,
            priority: upsert.priority,
            category: upsert.category,
            status: TaskStatus::Active,
            summary: upsert.summary,
            description: upsert.description,
            acted_instruction: upsert.acted_instruction,
            pilot_message: upsert.pilot_message,
            fingerprint: fp,
            seq,
            created_at: now,
            last_seen: now,
            resolved_at: None,
            alert_id: upsert.alert_id,
        };
        self.tasks.insert(task.id.clone(), task.clone());
        task
    }

    /// Mark a task resolved. Returns false for unknown ids.
    pub fn resolve(&mut self, task_id: &str) -> bool {
        match self.tasks.get_mut(task_id) {
            Some(task) => {
                task.status = TaskStatus::Resolved;
                task.resolved_at = Some(Utc::now());
                true
            }
            None => false,
        }
    }

    pub fn get(&self, task_id: &str) -> Option<&Task> {
        self.tasks.get(task_id)
    }

    /// Active tasks, HIGH before MEDIUM before LOW, creation order within a
    /// priority.
    pub fn list_active(&self, sort_by_priority: bool) -> Vec<Task> {
        let mut active: Vec<Task> = self
            .tasks
            .values()
            .filter(|t| t.status == TaskStatus::Active)
            .cloned()
            .collect();

        if sort_by_priority {
            active.sort_by_key(|t| (t.priority.rank(), t.seq));
        } else {
            active.sort_by_key(|t| t.seq);
        }

        active
    }

    /// Expire ACTIVE tasks not seen within the window. Returns the count.
    pub fn expire_stale(&mut self, window: Duration) -> usize {
        let threshold = Utc::now() - window;
        let mut expired = 0;

        for task in self.tasks.values_mut() {
            if task.status == TaskStatus::Active && task.last_seen < threshold {
                task.status = TaskStatus::Expired;
                expired += 1;
            }
        }

        expired
    }

    /// Drop RESOLVED/EXPIRED tasks whose last activity is older than the
    /// retention window. Returns the count removed.
    pub fn purge_settled(&mut self, retention: Duration) -> usize {
        let threshold = Utc::now() - retention;
        let before = self.tasks.len();
        self.tasks.retain(|_, task| {
            if task.status == TaskStatus::Active {
                return true;
            }
            let settled_at = task.resolved_at.unwrap_or(task.last_seen);
            settled_at >= threshold
        });
        before - self.tasks.len()
    }

    pub fn stats(&self) -> LedgerStats {
        let mut stats = LedgerStats {
            total: self.tasks.len(),
            ..Default::default()
        };
        for task in self.tasks.values() {
            match task.status {
                TaskStatus::Active => {
                    stats.active += 1;
                    match task.priority {
                        TaskPriority::High => stats.high_priority += 1,
                        TaskPriority::Medium => stats.medium_priority += 1,
                        TaskPriority::Low => stats.low_priority += 1,
                    }
                }
                TaskStatus::Resolved => stats.resolved += 1,
                TaskStatus::Expired => stats.expired += 1,
            }
        }
        stats
    }

    /// Full table contents, for persistence.
    pub fn snapshot(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.tasks.values().cloned().collect();
        tasks.sort_by_key(|t| t.seq);
        tasks
    }

    /// Replace the table contents, for startup restore.
    pub fn restore(&mut self, tasks: Vec<Task>) {
        self.next_seq = tasks.iter().map(|t| t.seq + 1).max().unwrap_or(0);
        self.tasks = tasks.into_iter().map(|t| (t.id.clone(), t)).collect();
    }
}
