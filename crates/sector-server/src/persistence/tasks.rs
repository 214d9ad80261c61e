//! Task table storage.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use sector_core::{Task, TaskCategory, TaskPriority, TaskStatus};

/// Replace the stored snapshot with the ledger's current contents.
pub async fn save_tasks(pool: &SqlitePool, tasks: &[Task]) -> Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM tasks").execute(&mut *tx).await?;

    for task in tasks {
        sqlx::query(
            "INSERT INTO tasks (id, entity_id, callsign, priority, category, status, summary, \
             description, acted_instruction, pilot_message, fingerprint, seq, created_at, \
             last_seen, resolved_at, alert_id) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&task.id)
        .bind(&task.entity_id)
        .bind(&task.callsign)
        .bind(task.priority.as_str())
        .bind(task.category.as_str())
        .bind(status_str(task.status))
        .bind(&task.summary)
        .bind(&task.description)
        .bind(&task.acted_instruction)
        .bind(&task.pilot_message)
        .bind(&task.fingerprint)
        .bind(task.seq as i64)
        .bind(task.created_at.to_rfc3339())
        .bind(task.last_seen.to_rfc3339())
        .bind(task.resolved_at.map(|t| t.to_rfc3339()))
        .bind(&task.alert_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Load the stored snapshot, oldest first.
pub async fn load_tasks(pool: &SqlitePool) -> Result<Vec<Task>> {
    let rows = sqlx::query("SELECT * FROM tasks ORDER BY seq ASC")
        .fetch_all(pool)
        .await?;

    let mut tasks = Vec::with_capacity(rows.len());
    for row in rows {
        tasks.push(Task {
            id: row.get("id"),
            entity_id: row.get("entity_id"),
            callsign: row.get("callsign"),
            priority: parse_priority(&row.get::<String, _>("priority"))?,
            category: parse_category(&row.get::<String, _>("category"))?,
            status: parse_status(&row.get::<String, _>("status"))?,
            summary: row.get("summary"),
            description: row.get("description"),
            acted_instruction: row.get("acted_instruction"),
            pilot_message: row.get("pilot_message"),
            fingerprint: row.get("fingerprint"),
            seq: row.get::<i64, _>("seq") as u64,
            created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
            last_seen: parse_timestamp(&row.get::<String, _>("last_seen"))?,
            resolved_at: row
                .get::<Option<String>, _>("resolved_at")
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
            alert_id: row.get("alert_id"),
        });
    }

    Ok(tasks)
}

fn status_str(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Active => "ACTIVE",
        TaskStatus::Resolved => "RESOLVED",
        TaskStatus::Expired => "EXPIRED",
    }
}

fn parse_status(raw: &str) -> Result<TaskStatus> {
    match raw {
        "ACTIVE" => Ok(TaskStatus::Active),
        "RESOLVED" => Ok(TaskStatus::Resolved),
        "EXPIRED" => Ok(TaskStatus::Expired),
        other => Err(anyhow!("unknown task status '{other}'")),
    }
}

fn parse_priority(raw: &str) -> Result<TaskPriority> {
    match raw {
        "HIGH" => Ok(TaskPriority::High),
        "MEDIUM" => Ok(TaskPriority::Medium),
        "LOW" => Ok(TaskPriority::Low),
        other => Err(anyhow!("unknown task priority '{other}'")),
    }
}

fn parse_category(raw: &str) -> Result<TaskCategory> {
    Ok(match raw {
        "RUNWAY" => TaskCategory::Runway,
        "SEPARATION" => TaskCategory::Separation,
        "WEATHER" => TaskCategory::Weather,
        "ALTITUDE" => TaskCategory::Altitude,
        "SPEED" => TaskCategory::Speed,
        "HEADING" => TaskCategory::Heading,
        "CONFLICT" => TaskCategory::Conflict,
        "COMMUNICATION" => TaskCategory::Communication,
        _ => TaskCategory::Other,
    })
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}
