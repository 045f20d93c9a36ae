// Trigger endpoint: processes push requests naming pipelines to start

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tracing::instrument;

use common::errors::StarterError;
use common::message;
use common::models::PipelineSelector;

use super::{ErrorResponse, SuccessResponse};
use crate::state::AppState;

/// Token meaning "evaluate every schedule-enabled pipeline now".
const SCHEDULED_TOKEN: &str = "scheduled";

#[derive(Debug, Serialize)]
pub struct TriggerOutcome {
    pub pipeline_ids: Vec<i64>,
}

/// Handle a push message asking to start pipelines.
///
/// The body is a push envelope whose payload names either the literal
/// `"scheduled"` token or an explicit list of pipeline ids.
#[instrument(skip(state, body))]
pub async fn start_pipeline(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SuccessResponse<TriggerOutcome>>, ErrorResponse> {
    let request = message::extract_trigger_request(&body)
        .map_err(|e| ErrorResponse::new("bad_request", e.to_string()))?;

    let pipeline_ids = match request.pipeline_ids {
        PipelineSelector::Token(token) if token == SCHEDULED_TOKEN => state
            .service
            .start_scheduled(Utc::now())
            .await
            .map_err(starter_error)?,
        PipelineSelector::Token(other) => {
            return Err(ErrorResponse::new(
                "bad_request",
                format!("Unknown pipeline selector: {other:?}"),
            ));
        }
        PipelineSelector::Explicit(ids) => state
            .service
            .start_pipelines(&ids)
            .await
            .map_err(starter_error)?,
    };

    Ok(Json(SuccessResponse::new(TriggerOutcome { pipeline_ids })))
}

fn starter_error(err: StarterError) -> ErrorResponse {
    match err {
        // A stored schedule validation should have rejected; the request
        // itself was fine.
        StarterError::Cron(e) => ErrorResponse::new("schedule_error", e.to_string()),
        StarterError::Store(e) => ErrorResponse::new("database_error", e.to_string()),
    }
}
