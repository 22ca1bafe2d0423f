use crate::adapters::WebPushSender;
use crate::app::authz::{ApiError, api_error};
use crate::ports::PushSender;
use crate::push as push_service;
use crate::push::NotificationPayload;
use crate::push::sweep::NOTIFICATION_ICON;
use crate::records::PushSubscription;
use crate::state;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub(crate) struct PublicKeyResponse {
    #[serde(rename = "publicKey")]
    pub(crate) public_key: String,
}

/// Hands the VAPID public key to the client so it can call
/// `pushManager.subscribe()` with the right application server key.
pub(crate) async fn public_vapid_key(
    State(state): State<state::AppState>,
) -> Result<Json<PublicKeyResponse>, ApiError> {
    let vapid = match push_service::load_vapid_config(&state.config) {
        push_service::VapidConfigStatus::Ready(vapid) => vapid,
        push_service::VapidConfigStatus::Incomplete | push_service::VapidConfigStatus::Missing => {
            return Err(api_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "Push notifications are not configured",
            ));
        }
    };

    Ok(Json(PublicKeyResponse {
        public_key: vapid.public_key,
    }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct TestPushRequest {
    #[serde(default)]
    pub(crate) key: String,
}

#[derive(Serialize)]
pub(crate) struct TestPushResponse {
    pub(crate) ok: bool,
}

/// Sends one immediate test notification to a stored subscription. Auth is
/// the key alone: lower friction for the user-facing "send me a test" button,
/// and the key by itself cannot mutate schedule or budget data.
pub(crate) async fn test_push(
    State(state): State<state::AppState>,
    Json(request): Json<TestPushRequest>,
) -> Result<Json<TestPushResponse>, ApiError> {
    let vapid = match push_service::load_vapid_config(&state.config) {
        push_service::VapidConfigStatus::Ready(vapid) => vapid,
        push_service::VapidConfigStatus::Incomplete | push_service::VapidConfigStatus::Missing => {
            return Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "VAPID keys missing",
            ));
        }
    };

    if request.key.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Missing key"));
    }
    let record = state
        .subscriptions
        .get(&request.key)
        .map_err(|err| {
            eprintln!("subscription store error: {err}");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Subscription store error")
        })?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Subscription not found"))?;

    // Registration stores the subscription object verbatim; a malformed one
    // fails here, on the send path.
    let subscription: PushSubscription =
        serde_json::from_value(record.subscription).map_err(|err| {
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Invalid stored subscription: {err}"),
            )
        })?;

    let sender = WebPushSender::new(vapid).map_err(|err| {
        eprintln!("test push error: failed to init web-push ({err})");
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to initialize push sender",
        )
    })?;

    let payload = NotificationPayload {
        title: "\u{1f514} Test".to_string(),
        body: format!(
            "Das ist eine Test-Benachrichtigung von {}",
            state.config.app_name
        ),
        icon: NOTIFICATION_ICON.to_string(),
        tag: "test-push".to_string(),
        require_interaction: None,
        data: None,
    };
    let payload = serde_json::to_string(&payload)
        .map_err(|err| api_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;

    if let Err(err) = sender.send(&subscription, &payload).await {
        eprintln!("test push error: {err}");
        return Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()));
    }

    Ok(Json(TestPushResponse { ok: true }))
}
