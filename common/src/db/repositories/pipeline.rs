// Pipeline repository

use crate::db::DbPool;
use crate::errors::DatabaseError;
use crate::models::{Pipeline, Schedule};
use crate::starter::PipelineStore;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;
use std::collections::HashMap;
use tracing::instrument;

/// Repository for pipeline reads.
///
/// The starter never writes pipeline records; creation and editing belong
/// to the management API that owns the tables.
pub struct PipelineRepository {
    pool: DbPool,
}

impl PipelineRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// All pipelines flagged to run on schedule, schedules attached.
    #[instrument(skip(self))]
    pub async fn find_scheduled(&self) -> Result<Vec<Pipeline>, DatabaseError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, emails_for_notifications, status,
                   run_on_schedule, created_at, updated_at
            FROM pipelines
            WHERE run_on_schedule = true
            "#,
        )
        .fetch_all(self.pool.pool())
        .await?;

        let mut pipelines = rows
            .into_iter()
            .map(map_pipeline_row)
            .collect::<Result<Vec<_>, _>>()?;

        self.attach_schedules(&mut pipelines).await?;

        tracing::debug!(count = pipelines.len(), "Loaded schedule-enabled pipelines");
        Ok(pipelines)
    }

    /// Pipelines with the given ids. Unknown ids are absent from the result.
    #[instrument(skip(self))]
    pub async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Pipeline>, DatabaseError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT id, name, emails_for_notifications, status,
                   run_on_schedule, created_at, updated_at
            FROM pipelines
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(self.pool.pool())
        .await?;

        let mut pipelines = rows
            .into_iter()
            .map(map_pipeline_row)
            .collect::<Result<Vec<_>, _>>()?;

        self.attach_schedules(&mut pipelines).await?;

        Ok(pipelines)
    }

    /// Load the schedules for every pipeline in `pipelines` in one query
    /// and attach them to their owners.
    async fn attach_schedules(&self, pipelines: &mut [Pipeline]) -> Result<(), DatabaseError> {
        if pipelines.is_empty() {
            return Ok(());
        }

        let ids: Vec<i64> = pipelines.iter().map(|p| p.id).collect();
        let schedules = sqlx::query_as::<_, Schedule>(
            r#"
            SELECT id, pipeline_id, cron
            FROM schedules
            WHERE pipeline_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(&ids)
        .fetch_all(self.pool.pool())
        .await?;

        let mut by_pipeline: HashMap<i64, Vec<Schedule>> = HashMap::new();
        for schedule in schedules {
            by_pipeline
                .entry(schedule.pipeline_id)
                .or_default()
                .push(schedule);
        }

        for pipeline in pipelines {
            pipeline.schedules = by_pipeline.remove(&pipeline.id).unwrap_or_default();
        }

        Ok(())
    }
}

fn map_pipeline_row(row: PgRow) -> Result<Pipeline, DatabaseError> {
    let status: String = row.try_get("status")?;
    let status = status.parse().map_err(DatabaseError::QueryFailed)?;

    Ok(Pipeline {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        emails_for_notifications: row.try_get("emails_for_notifications")?,
        status,
        run_on_schedule: row.try_get("run_on_schedule")?,
        schedules: Vec::new(),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl PipelineStore for PipelineRepository {
    async fn find_scheduled(&self) -> Result<Vec<Pipeline>, DatabaseError> {
        PipelineRepository::find_scheduled(self).await
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Pipeline>, DatabaseError> {
        PipelineRepository::find_by_ids(self, ids).await
    }
}
