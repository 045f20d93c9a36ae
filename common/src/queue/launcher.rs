// Pipeline launcher implementation for NATS JetStream

use crate::errors::QueueError;
use crate::models::StartOrder;
use crate::queue::nats::NatsClient;
use crate::starter::PipelineLauncher;
use async_nats::jetstream::context::PublishAckFuture;
use std::time::Duration;
use tracing::{info, instrument};

/// Publishes start orders to the pipeline start queue.
///
/// Each order is published under a per-pipeline subject with the trigger id
/// as the deduplication key, so a retried trigger request cannot start the
/// same order twice.
pub struct NatsPipelineLauncher {
    client: NatsClient,
    subject_prefix: String,
    publish_timeout: Duration,
}

impl NatsPipelineLauncher {
    pub fn new(client: NatsClient) -> Self {
        Self {
            client,
            subject_prefix: "pipelines.start".to_string(),
            publish_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = timeout;
        self
    }

    fn subject(&self, pipeline_id: i64) -> String {
        format!("{}.{}", self.subject_prefix, pipeline_id)
    }
}

#[async_trait::async_trait]
impl PipelineLauncher for NatsPipelineLauncher {
    #[instrument(skip(self), fields(
        pipeline_id = order.pipeline_id,
        trigger_id = %order.trigger_id
    ))]
    async fn launch(&self, order: &StartOrder) -> Result<(), QueueError> {
        let payload = serde_json::to_vec(order).map_err(|e| {
            QueueError::SerializationFailed(format!("Failed to serialize start order: {}", e))
        })?;

        let subject = self.subject(order.pipeline_id);

        let mut headers = async_nats::HeaderMap::new();
        headers.insert("Nats-Msg-Id", order.trigger_id.to_string().as_str());
        headers.insert("Pipeline-Id", order.pipeline_id.to_string().as_str());

        let publish_future: PublishAckFuture = self
            .client
            .jetstream()
            .publish_with_headers(subject, headers, payload.into())
            .await
            .map_err(|e| QueueError::PublishFailed(format!("Failed to publish order: {}", e)))?;

        // The order only counts as issued once JetStream acknowledges it.
        match tokio::time::timeout(self.publish_timeout, publish_future).await {
            Ok(Ok(_ack)) => {
                info!("Start order published");
                Ok(())
            }
            Ok(Err(e)) => Err(QueueError::PublishFailed(format!(
                "Publish not acknowledged: {}",
                e
            ))),
            Err(_) => Err(QueueError::Timeout(format!(
                "No acknowledgment within {:?}",
                self.publish_timeout
            ))),
        }
    }
}
