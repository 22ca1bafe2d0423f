use crate::app::authz::{ApiError, api_error, authorize_subscription};
use crate::identity;
use crate::records::{SubscriptionRecord, epoch_millis};
use crate::schedule;
use crate::state;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use time::OffsetDateTime;

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterRequest {
    pub(crate) timezone: Option<String>,
    #[serde(default)]
    pub(crate) subscription: JsonValue,
}

#[derive(Serialize)]
pub(crate) struct RegisterResponse {
    pub(crate) ok: bool,
    pub(crate) key: String,
    pub(crate) token: String,
}

/// Stores the caller's push subscription under `SHA256(endpoint)` and hands
/// back the key/token pair for later mutations. Re-registering the same
/// endpoint overwrites the record wholesale and yields the identical pair.
pub(crate) async fn register(
    State(state): State<state::AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let endpoint = request
        .subscription
        .get("endpoint")
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .filter(|endpoint| !endpoint.is_empty())
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Missing subscription endpoint"))?;

    let secret = state.config.hmac_secret.as_deref().unwrap_or_default();
    let key = identity::derive_key(endpoint);
    let token = identity::issue_token(secret, endpoint)
        .map_err(|err| api_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;

    let record = SubscriptionRecord {
        endpoint: endpoint.to_string(),
        subscription: request.subscription,
        timezone: Some(
            schedule::timezone_or_default(request.timezone.as_deref()).to_string(),
        ),
        schedule: None,
        created_at: epoch_millis(OffsetDateTime::now_utc()),
        updated_at: None,
    };
    state.subscriptions.set(&key, &record).map_err(|err| {
        eprintln!("subscription store error: {err}");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Subscription store error")
    })?;

    Ok(Json(RegisterResponse {
        ok: true,
        key,
        token,
    }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateScheduleRequest {
    #[serde(default)]
    pub(crate) key: String,
    pub(crate) timezone: Option<String>,
    #[serde(default)]
    pub(crate) schedule: JsonValue,
}

#[derive(Serialize)]
pub(crate) struct UpdateScheduleResponse {
    pub(crate) ok: bool,
    pub(crate) schedule: Vec<String>,
}

pub(crate) async fn update_schedule(
    State(state): State<state::AppState>,
    headers: HeaderMap,
    Json(request): Json<UpdateScheduleRequest>,
) -> Result<Json<UpdateScheduleResponse>, ApiError> {
    if request.key.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Missing key"));
    }
    let Some(entries) = request.schedule.as_array() else {
        return Err(api_error(StatusCode::BAD_REQUEST, "Schedule must be a list"));
    };
    let sanitized = schedule::sanitize_schedule(entries);

    let mut record = authorize_subscription(&state, &headers, &request.key)?;
    record.schedule = Some(sanitized.clone());
    if let Some(timezone) = request.timezone
        && !timezone.trim().is_empty()
    {
        record.timezone = Some(timezone);
    }
    record.updated_at = Some(epoch_millis(OffsetDateTime::now_utc()));

    state.subscriptions.set(&request.key, &record).map_err(|err| {
        eprintln!("subscription store error: {err}");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Subscription store error")
    })?;

    Ok(Json(UpdateScheduleResponse {
        ok: true,
        schedule: sanitized,
    }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct GetScheduleRequest {
    #[serde(default)]
    pub(crate) key: String,
}

#[derive(Serialize)]
pub(crate) struct GetScheduleResponse {
    pub(crate) ok: bool,
    pub(crate) timezone: String,
    pub(crate) schedule: Vec<String>,
}

/// Returns the effective schedule: the subscription's own times, else the
/// budget-snapshot mirror, else the hard default.
pub(crate) async fn get_schedule(
    State(state): State<state::AppState>,
    headers: HeaderMap,
    Json(request): Json<GetScheduleRequest>,
) -> Result<Json<GetScheduleResponse>, ApiError> {
    if request.key.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Missing key"));
    }
    let record = authorize_subscription(&state, &headers, &request.key)?;

    let snapshot = state.budgets.get(&request.key).unwrap_or_else(|err| {
        eprintln!("budget store warning: {err}");
        None
    });
    let effective = schedule::effective_schedule(
        record.schedule.as_deref(),
        snapshot.as_ref().and_then(|s| s.schedule.as_deref()),
    );

    Ok(Json(GetScheduleResponse {
        ok: true,
        timezone: schedule::timezone_or_default(record.timezone.as_deref()).to_string(),
        schedule: effective,
    }))
}
