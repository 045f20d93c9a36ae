use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Pipeline Models
// ============================================================================

/// Pipeline is a registered recurring job that can carry schedules.
///
/// Ownership of the record lives with the pipeline management service; this
/// service only reads the id, the run_on_schedule flag, and the attached
/// schedules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: i64,
    pub name: String,
    pub emails_for_notifications: Option<String>,
    pub status: PipelineStatus,
    pub run_on_schedule: bool,
    pub schedules: Vec<Schedule>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Schedule attaches one cron expression to a pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Schedule {
    pub id: i64,
    pub pipeline_id: i64,
    pub cron: String,
}

/// Lifecycle state of a pipeline, informational to this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Idle,
    Running,
    Stopping,
    Finished,
    Failed,
    Succeeded,
}

impl FromStr for PipelineStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(PipelineStatus::Idle),
            "running" => Ok(PipelineStatus::Running),
            "stopping" => Ok(PipelineStatus::Stopping),
            "finished" => Ok(PipelineStatus::Finished),
            "failed" => Ok(PipelineStatus::Failed),
            "succeeded" => Ok(PipelineStatus::Succeeded),
            other => Err(format!("Unknown pipeline status: {other}")),
        }
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStatus::Idle => "idle",
            PipelineStatus::Running => "running",
            PipelineStatus::Stopping => "stopping",
            PipelineStatus::Finished => "finished",
            PipelineStatus::Failed => "failed",
            PipelineStatus::Succeeded => "succeeded",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Trigger Messages
// ============================================================================

/// Payload carried by an inbound trigger request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerRequest {
    pub pipeline_ids: PipelineSelector,
}

/// Which pipelines a trigger request names: an explicit id list, or a
/// token. The only meaningful token is `"scheduled"`, meaning evaluate
/// every schedule-enabled pipeline against the current instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PipelineSelector {
    Explicit(Vec<i64>),
    Token(String),
}

/// What caused a pipeline start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    Scheduled,
    Manual,
}

/// Start order handed to the launch queue, one per pipeline to start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartOrder {
    pub pipeline_id: i64,
    /// Unique per order; doubles as the queue deduplication key.
    pub trigger_id: Uuid,
    pub trigger_source: TriggerSource,
    pub requested_at: DateTime<Utc>,
}

impl StartOrder {
    pub fn new(pipeline_id: i64, trigger_source: TriggerSource, requested_at: DateTime<Utc>) -> Self {
        Self {
            pipeline_id,
            trigger_id: Uuid::new_v4(),
            trigger_source,
            requested_at,
        }
    }
}
