// Starter service: decides which pipelines to start and hands out orders
//
// The service is glued together from two narrow capabilities so the
// decision logic stays a pure function over explicit inputs: a store that
// yields candidate pipelines and a launcher that accepts start orders.

use crate::cron;
use crate::errors::{DatabaseError, QueueError, StarterError};
use crate::models::{Pipeline, StartOrder, TriggerSource};
use crate::telemetry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[cfg(test)]
use mockall::automock;

/// Read-only access to pipeline records.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PipelineStore: Send + Sync {
    /// All pipelines flagged to run on schedule, with schedules attached.
    async fn find_scheduled(&self) -> Result<Vec<Pipeline>, DatabaseError>;

    /// Pipelines with the given ids; unknown ids are simply absent from the
    /// result.
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Pipeline>, DatabaseError>;
}

/// Sink accepting pipeline start orders.
///
/// Fire-and-forget: the starter does not observe what happens to a pipeline
/// after its order is accepted.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PipelineLauncher: Send + Sync {
    async fn launch(&self, order: &StartOrder) -> Result<(), QueueError>;
}

/// Composition of store and launcher behind the trigger endpoint.
#[derive(Clone)]
pub struct StarterService {
    store: Arc<dyn PipelineStore>,
    launcher: Arc<dyn PipelineLauncher>,
}

impl StarterService {
    pub fn new(store: Arc<dyn PipelineStore>, launcher: Arc<dyn PipelineLauncher>) -> Self {
        Self { store, launcher }
    }

    /// Evaluate every schedule-enabled pipeline against `at` and issue a
    /// start order for each due one. Returns the ids actually launched.
    ///
    /// # Errors
    /// `StarterError::Store` if the candidates cannot be loaded;
    /// `StarterError::Cron` if a stored schedule turns out to be defective.
    /// Individual launch refusals are logged and skipped, not propagated.
    #[instrument(skip(self))]
    pub async fn start_scheduled(&self, at: DateTime<Utc>) -> Result<Vec<i64>, StarterError> {
        telemetry::record_trigger_request("scheduled");

        let pipelines = self.store.find_scheduled().await?;
        debug!(count = pipelines.len(), "Loaded schedule-enabled pipelines");

        let due = cron::select_due_pipelines(&pipelines, at)?;

        let mut launched = Vec::with_capacity(due.len());
        for pipeline in pipelines.iter().filter(|p| due.contains(&p.id)) {
            if self.launch(pipeline, TriggerSource::Scheduled, at).await {
                launched.push(pipeline.id);
            }
        }

        telemetry::record_pipelines_triggered("scheduled", launched.len() as u64);
        info!(
            candidates = pipelines.len(),
            due = due.len(),
            launched = launched.len(),
            "Scheduled pipelines evaluated"
        );

        Ok(launched)
    }

    /// Issue start orders for explicitly named pipelines.
    ///
    /// Ids that do not resolve to a pipeline are skipped with a warning,
    /// matching how manual triggers have always behaved.
    #[instrument(skip(self))]
    pub async fn start_pipelines(&self, ids: &[i64]) -> Result<Vec<i64>, StarterError> {
        telemetry::record_trigger_request("explicit");

        let pipelines = self.store.find_by_ids(ids).await?;
        if pipelines.len() != ids.len() {
            warn!(
                requested = ids.len(),
                found = pipelines.len(),
                "Some requested pipelines do not exist"
            );
        }

        let now = Utc::now();
        let mut launched = Vec::with_capacity(pipelines.len());
        for pipeline in &pipelines {
            if self.launch(pipeline, TriggerSource::Manual, now).await {
                launched.push(pipeline.id);
            }
        }

        telemetry::record_pipelines_triggered("manual", launched.len() as u64);
        info!(launched = launched.len(), "Manual pipelines started");

        Ok(launched)
    }

    async fn launch(
        &self,
        pipeline: &Pipeline,
        source: TriggerSource,
        requested_at: DateTime<Utc>,
    ) -> bool {
        let order = StartOrder::new(pipeline.id, source, requested_at);
        match self.launcher.launch(&order).await {
            Ok(()) => {
                info!(
                    pipeline_id = pipeline.id,
                    pipeline_name = %pipeline.name,
                    trigger_id = %order.trigger_id,
                    "Pipeline start order issued"
                );
                true
            }
            Err(e) => {
                telemetry::record_launch_failure();
                warn!(
                    pipeline_id = pipeline.id,
                    pipeline_name = %pipeline.name,
                    error = %e,
                    "Failed to issue start order"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CronError;
    use crate::models::{PipelineStatus, Schedule};
    use chrono::TimeZone;

    fn pipeline(id: i64, crons: &[&str]) -> Pipeline {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Pipeline {
            id,
            name: format!("pipeline-{id}"),
            emails_for_notifications: None,
            status: PipelineStatus::Idle,
            run_on_schedule: true,
            schedules: crons
                .iter()
                .enumerate()
                .map(|(i, cron)| Schedule {
                    id: id * 100 + i as i64,
                    pipeline_id: id,
                    cron: (*cron).to_string(),
                })
                .collect(),
            created_at: now,
            updated_at: now,
        }
    }

    fn service(
        store: MockPipelineStore,
        launcher: MockPipelineLauncher,
    ) -> StarterService {
        StarterService::new(Arc::new(store), Arc::new(launcher))
    }

    #[tokio::test]
    async fn scheduled_trigger_launches_only_due_pipelines() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();

        let mut store = MockPipelineStore::new();
        store.expect_find_scheduled().times(1).returning(|| {
            Ok(vec![
                pipeline(1, &["0 * * * *"]),
                pipeline(2, &["30 4 * * *"]),
                pipeline(3, &[]),
            ])
        });

        let mut launcher = MockPipelineLauncher::new();
        launcher
            .expect_launch()
            .withf(|order| {
                order.pipeline_id == 1 && order.trigger_source == TriggerSource::Scheduled
            })
            .times(1)
            .returning(|_| Ok(()));

        let launched = service(store, launcher).start_scheduled(at).await.unwrap();
        assert_eq!(launched, vec![1]);
    }

    #[tokio::test]
    async fn scheduled_trigger_with_nothing_due_launches_nothing() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 10, 5, 0).unwrap();

        let mut store = MockPipelineStore::new();
        store
            .expect_find_scheduled()
            .returning(|| Ok(vec![pipeline(1, &["0 * * * *"])]));

        let mut launcher = MockPipelineLauncher::new();
        launcher.expect_launch().times(0);

        let launched = service(store, launcher).start_scheduled(at).await.unwrap();
        assert!(launched.is_empty());
    }

    #[tokio::test]
    async fn pipeline_with_two_matching_schedules_is_launched_once() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();

        let mut store = MockPipelineStore::new();
        store
            .expect_find_scheduled()
            .returning(|| Ok(vec![pipeline(5, &["0 * * * *", "* 10 * * *"])]));

        let mut launcher = MockPipelineLauncher::new();
        launcher
            .expect_launch()
            .withf(|order| order.pipeline_id == 5)
            .times(1)
            .returning(|_| Ok(()));

        let launched = service(store, launcher).start_scheduled(at).await.unwrap();
        assert_eq!(launched, vec![5]);
    }

    #[tokio::test]
    async fn defective_stored_schedule_fails_the_evaluation() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();

        let mut store = MockPipelineStore::new();
        store
            .expect_find_scheduled()
            .returning(|| Ok(vec![pipeline(1, &["*/5 * * * *"])]));

        let mut launcher = MockPipelineLauncher::new();
        launcher.expect_launch().times(0);

        let err = service(store, launcher)
            .start_scheduled(at)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StarterError::Cron(CronError::UnsupportedSyntax { token: '/' })
        ));
    }

    #[tokio::test]
    async fn launch_refusal_skips_the_pipeline_but_not_the_rest() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();

        let mut store = MockPipelineStore::new();
        store.expect_find_scheduled().returning(|| {
            Ok(vec![pipeline(1, &["0 * * * *"]), pipeline(2, &["0 * * * *"])])
        });

        let mut launcher = MockPipelineLauncher::new();
        launcher
            .expect_launch()
            .times(2)
            .returning(|order| match order.pipeline_id {
                1 => Err(QueueError::PublishFailed("stream gone".to_string())),
                _ => Ok(()),
            });

        let launched = service(store, launcher).start_scheduled(at).await.unwrap();
        assert_eq!(launched, vec![2]);
    }

    #[tokio::test]
    async fn explicit_trigger_skips_unknown_ids() {
        let mut store = MockPipelineStore::new();
        store
            .expect_find_by_ids()
            .withf(|ids| ids == [7, 8])
            .times(1)
            .returning(|_| Ok(vec![pipeline(7, &[])]));

        let mut launcher = MockPipelineLauncher::new();
        launcher
            .expect_launch()
            .withf(|order| {
                order.pipeline_id == 7 && order.trigger_source == TriggerSource::Manual
            })
            .times(1)
            .returning(|_| Ok(()));

        let launched = service(store, launcher)
            .start_pipelines(&[7, 8])
            .await
            .unwrap();
        assert_eq!(launched, vec![7]);
    }

    #[tokio::test]
    async fn explicit_trigger_ignores_schedules_entirely() {
        // A manual trigger starts the pipeline even if no schedule matches
        // anything right now.
        let mut store = MockPipelineStore::new();
        store
            .expect_find_by_ids()
            .returning(|_| Ok(vec![pipeline(4, &["0 0 1 1 *"])]));

        let mut launcher = MockPipelineLauncher::new();
        launcher.expect_launch().times(1).returning(|_| Ok(()));

        let launched = service(store, launcher)
            .start_pipelines(&[4])
            .await
            .unwrap();
        assert_eq!(launched, vec![4]);
    }
}
