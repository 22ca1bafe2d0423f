use crate::adapters::{TokioTimeProvider, WebPushSender};
use crate::config;
use crate::store::{BudgetStore, SubscriptionStore};

pub(crate) mod sweep;
pub(crate) mod vapid;

use serde::Serialize;
use tokio::task::JoinHandle;

pub use vapid::{VapidConfig, VapidCredentials, generate_vapid_credentials};
pub(crate) use vapid::{VapidConfigStatus, load_vapid_config};

/// The JSON object delivered to the service worker, which renders it as a
/// visible notification.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub tag: String,
    #[serde(rename = "requireInteraction", skip_serializing_if = "Option::is_none")]
    pub require_interaction: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Starts the once-per-minute reminder sweep if push is configured. Without
/// complete VAPID material the sweep stays off and the rest of the API keeps
/// working.
pub fn maybe_start_sweep(
    config: &config::AppConfig,
    subscriptions: SubscriptionStore,
    budgets: BudgetStore,
) -> Option<JoinHandle<()>> {
    let vapid = match load_vapid_config(config) {
        VapidConfigStatus::Ready(vapid) => vapid,
        VapidConfigStatus::Incomplete => {
            eprintln!("reminder sweep disabled: incomplete VAPID configuration");
            return None;
        }
        VapidConfigStatus::Missing => {
            return None;
        }
    };

    let sender = match WebPushSender::new(vapid) {
        Ok(sender) => sender,
        Err(err) => {
            eprintln!("reminder sweep disabled: failed to init web-push ({err})");
            return None;
        }
    };

    let sweep = sweep::ReminderSweep::new(
        TokioTimeProvider,
        sender,
        subscriptions,
        budgets,
        config.app_name.clone(),
    );
    Some(sweep.spawn())
}
