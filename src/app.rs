use crate::adapters::FsBlobStore;
use crate::assets;
use crate::config;
use crate::push as push_service;
use crate::state;
use crate::store::{BudgetStore, SubscriptionStore};

use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;

mod authz;
mod budget;
mod push;
mod subscriptions;

pub fn app(config: config::AppConfig) -> Router {
    let subscriptions = SubscriptionStore::new(Arc::new(FsBlobStore::new(
        config.data_dir.join("subscriptions"),
    )));
    let budgets = BudgetStore::new(Arc::new(FsBlobStore::new(config.data_dir.join("budgets"))));

    push_service::maybe_start_sweep(&config, subscriptions.clone(), budgets.clone());

    let state = state::AppState {
        config,
        subscriptions,
        budgets,
    };
    Router::new()
        .route("/api/register", post(subscriptions::register))
        .route("/api/update-schedule", post(subscriptions::update_schedule))
        .route("/api/get-schedule", post(subscriptions::get_schedule))
        .route("/api/update-budget", post(budget::update_budget))
        .route("/api/test-push", post(push::test_push))
        .route("/api/public-vapid-key", get(push::public_vapid_key))
        .route("/sw.js", get(assets::service_worker))
        .route("/health", get(health))
        .with_state(state)
}

pub(crate) async fn health() -> &'static str {
    "ok"
}
