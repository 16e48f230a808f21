//! History records for completed operations. Persisting them is up to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::model::{GameGroup, SwitchOutcome};

static SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    pub game_id: String,
    pub emulator_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_owner: Option<String>,
    pub target_owner: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub status: OpStatus,
    pub details: serde_json::Value,
}

/// Unique within the process and sortable by start time.
pub fn next_operation_id(started_at: DateTime<Utc>) -> String {
    let n = SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{}-{:04}", started_at.format("%Y%m%d%H%M%S%3f"), n % 10_000)
}

impl HistoryRecord {
    /// Record for a finished operation. For export and import, `target` is the
    /// operation name.
    pub fn from_outcome<H>(
        group: &GameGroup<H>,
        source: Option<&str>,
        target: &str,
        started_at: DateTime<Utc>,
        outcome: &SwitchOutcome,
    ) -> Self {
        HistoryRecord {
            id: next_operation_id(started_at),
            game_id: group.id(),
            emulator_id: group.key.emulator_id.clone(),
            source_owner: source.map(str::to_string),
            target_owner: target.to_string(),
            started_at,
            ended_at: Some(Utc::now()),
            status: if outcome.succeeded { OpStatus::Success } else { OpStatus::Error },
            details: json!({ "message": outcome.message }),
        }
    }

    pub fn message(&self) -> Option<&str> {
        self.details.get("message").and_then(|m| m.as_str())
    }

    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
