use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use time::OffsetDateTime;

/// One stored push subscription, keyed by the SHA-256 of its endpoint.
///
/// The `subscription` field is the platform push-subscription object exactly
/// as the browser produced it. It is stored and forwarded verbatim; a
/// malformed object fails at send time, not at registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    pub endpoint: String,
    pub subscription: JsonValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Vec<String>>,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

/// Latest budget numbers a client chose to push, cached per subscription key.
///
/// Best-effort: a snapshot can outlive its subscription record, and the store
/// layer does not enforce referential integrity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSnapshotRecord {
    pub daily_budget: f64,
    pub remaining_budget: f64,
    pub remaining_days: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Vec<String>>,
    pub timezone: String,
    pub updated_at: i64,
}

/// The fields of a push-subscription object the send path actually needs.
/// Parsed out of the verbatim JSON just before handing off to web-push.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushSubscription {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

pub fn epoch_millis(instant: OffsetDateTime) -> i64 {
    (instant.unix_timestamp_nanos() / 1_000_000) as i64
}
