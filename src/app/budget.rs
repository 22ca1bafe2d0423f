use crate::app::authz::{ApiError, api_error, authorize_subscription};
use crate::records::{BudgetSnapshotRecord, epoch_millis};
use crate::schedule;
use crate::state;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use time::OffsetDateTime;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateBudgetRequest {
    #[serde(default)]
    pub(crate) key: String,
    #[serde(default)]
    pub(crate) daily_budget: JsonValue,
    #[serde(default)]
    pub(crate) remaining_budget: JsonValue,
    #[serde(default)]
    pub(crate) remaining_days: JsonValue,
}

#[derive(Serialize)]
pub(crate) struct UpdateBudgetResponse {
    pub(crate) ok: bool,
    pub(crate) key: String,
}

/// Overwrites the budget snapshot for a key with the client's latest numbers.
/// The previously stored schedule mirror survives the overwrite so the
/// read-side fallback chain keeps working.
pub(crate) async fn update_budget(
    State(state): State<state::AppState>,
    headers: HeaderMap,
    Json(request): Json<UpdateBudgetRequest>,
) -> Result<Json<UpdateBudgetResponse>, ApiError> {
    if request.key.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Missing key"));
    }
    let record = authorize_subscription(&state, &headers, &request.key)?;

    let prior = state.budgets.get(&request.key).unwrap_or_else(|err| {
        eprintln!("budget store warning: {err}");
        None
    });

    let timezone = record
        .timezone
        .or_else(|| prior.as_ref().map(|p| p.timezone.clone()))
        .unwrap_or_else(|| schedule::DEFAULT_TIMEZONE.to_string());

    let snapshot = BudgetSnapshotRecord {
        daily_budget: coerce_number(&request.daily_budget),
        remaining_budget: coerce_number(&request.remaining_budget),
        remaining_days: coerce_days(&request.remaining_days),
        schedule: prior.and_then(|p| p.schedule),
        timezone,
        updated_at: epoch_millis(OffsetDateTime::now_utc()),
    };
    state.budgets.set(&request.key, &snapshot).map_err(|err| {
        eprintln!("budget store error: {err}");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Budget store error")
    })?;

    Ok(Json(UpdateBudgetResponse {
        ok: true,
        key: request.key,
    }))
}

/// Deliberate leniency carried over from the original client contract:
/// numbers and numeric strings are accepted, everything else becomes 0.
fn coerce_number(value: &JsonValue) -> f64 {
    match value {
        JsonValue::Number(number) => number.as_f64().unwrap_or(0.0),
        JsonValue::String(raw) => raw.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn coerce_days(value: &JsonValue) -> i64 {
    coerce_number(value).max(0.0) as i64
}
