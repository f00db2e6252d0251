//! Request handlers
//!
//! Every path is served the same way; only the method matters.

use crate::error::AppError;
use crate::WebResult;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{Method, StatusCode},
    Json,
};
use serde::Serialize;
use serde_json::Value;

/// Successful response body
#[derive(Debug, Serialize)]
pub struct ListResponse {
    /// Always `true`
    pub success: bool,
    /// The stored list, present on reads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Value>>,
}

/// `GET`: the stored list
pub async fn read_list(State(state): State<AppState>) -> Json<ListResponse> {
    let list = state.list().await;
    tracing::debug!(items = list.len(), "Serving list");
    metrics::counter!("mock_server.requests", "method" => "GET").increment(1);

    Json(ListResponse {
        success: true,
        data: Some(list),
    })
}

/// `POST`: replace the stored list with the body
///
/// # Errors
///
/// Returns `400 BAD_REQUEST` when the body is not a JSON array.
pub async fn replace_list(State(state): State<AppState>, body: Bytes) -> WebResult<Json<ListResponse>> {
    metrics::counter!("mock_server.requests", "method" => "POST").increment(1);

    let parsed: Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::bad_request(format!("Body is not valid JSON: {e}")))?;
    let Value::Array(list) = parsed else {
        return Err(AppError::bad_request("Body must be a JSON array"));
    };

    tracing::info!(items = list.len(), "Replacing list");
    state.replace(list).await;

    Ok(Json(ListResponse {
        success: true,
        data: None,
    }))
}

/// `OPTIONS` and anything else: empty `200`
pub async fn empty(method: Method) -> StatusCode {
    tracing::debug!(%method, "Empty response");
    metrics::counter!("mock_server.requests", "method" => method.to_string()).increment(1);
    StatusCode::OK
}
