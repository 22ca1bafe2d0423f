use crate::identity;
use crate::records::SubscriptionRecord;
use crate::state;

use axum::Json;
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use serde::Serialize;

#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ")
}

/// Resolves `key` to its subscription record and checks the caller's bearer
/// token against the record's endpoint. A failed check tells the client to
/// re-register; there is no refresh mechanism.
pub(crate) fn authorize_subscription(
    state: &state::AppState,
    headers: &HeaderMap,
    key: &str,
) -> Result<SubscriptionRecord, ApiError> {
    let token = bearer_token(headers)
        .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "Unauthorized"))?;

    let record = state
        .subscriptions
        .get(key)
        .map_err(|err| {
            eprintln!("subscription store error: {err}");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Subscription store error")
        })?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Subscription not found"))?;

    let secret = state.config.hmac_secret.as_deref().unwrap_or_default();
    let valid = identity::verify_token(secret, &record.endpoint, token)
        .map_err(|err| api_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;
    if !valid {
        return Err(api_error(StatusCode::UNAUTHORIZED, "Invalid token"));
    }

    Ok(record)
}
