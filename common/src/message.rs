// Push envelope handling for inbound trigger requests
//
// The trigger endpoint is the target of a push subscription: the broker
// wraps the actual payload in an envelope and base64-encodes it. Only the
// `message.data` field matters here; everything else in the envelope is
// ignored.

use crate::errors::MessageError;
use crate::models::TriggerRequest;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct PushEnvelope {
    message: PushMessage,
}

#[derive(Debug, Deserialize)]
struct PushMessage {
    data: String,
}

/// Decode the base64 payload out of a push envelope into a trigger request.
///
/// # Errors
/// `MessageError::InvalidEnvelope` when the body is not a well-formed
/// envelope or the data is not base64; `MessageError::InvalidPayload` when
/// the decoded payload is not a trigger request.
pub fn extract_trigger_request(body: &[u8]) -> Result<TriggerRequest, MessageError> {
    let envelope: PushEnvelope =
        serde_json::from_slice(body).map_err(|e| MessageError::InvalidEnvelope(e.to_string()))?;

    let payload = BASE64
        .decode(envelope.message.data.as_bytes())
        .map_err(|e| MessageError::InvalidEnvelope(format!("data is not valid base64: {e}")))?;

    serde_json::from_slice(&payload).map_err(|e| MessageError::InvalidPayload(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PipelineSelector;
    use serde_json::json;

    fn envelope(payload: &serde_json::Value) -> Vec<u8> {
        json!({"message": {"data": BASE64.encode(payload.to_string())}})
            .to_string()
            .into_bytes()
    }

    #[test]
    fn test_extracts_scheduled_token() {
        let body = envelope(&json!({"pipeline_ids": "scheduled"}));
        let request = extract_trigger_request(&body).unwrap();
        assert!(matches!(
            request.pipeline_ids,
            PipelineSelector::Token(ref t) if t == "scheduled"
        ));
    }

    #[test]
    fn test_extracts_explicit_ids() {
        let body = envelope(&json!({"pipeline_ids": [1, 2, 3]}));
        let request = extract_trigger_request(&body).unwrap();
        assert!(matches!(
            request.pipeline_ids,
            PipelineSelector::Explicit(ref ids) if ids == &[1, 2, 3]
        ));
    }

    #[test]
    fn test_rejects_missing_message_field() {
        let err = extract_trigger_request(br#"{"data": "xxx"}"#).unwrap_err();
        assert!(matches!(err, MessageError::InvalidEnvelope(_)));
    }

    #[test]
    fn test_rejects_bad_base64() {
        let body = json!({"message": {"data": "!!not-base64!!"}}).to_string();
        let err = extract_trigger_request(body.as_bytes()).unwrap_err();
        assert!(matches!(err, MessageError::InvalidEnvelope(_)));
    }

    #[test]
    fn test_rejects_payload_without_pipeline_ids() {
        let body = envelope(&json!({"other": true}));
        let err = extract_trigger_request(&body).unwrap_err();
        assert!(matches!(err, MessageError::InvalidPayload(_)));
    }
}
