use crate::config::AppConfig;
use crate::store::{BudgetStore, SubscriptionStore};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub subscriptions: SubscriptionStore,
    pub budgets: BudgetStore,
}
