use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::ports;
use crate::push::NotificationPayload;
use crate::records::PushSubscription;
use crate::schedule;
use crate::store::{BudgetStore, SubscriptionStore};

use time::OffsetDateTime;

/// Cap on simultaneous in-flight sends per tick, to avoid hammering the push
/// provider when the subscriber count grows.
const MAX_CONCURRENT_SENDS: usize = 8;

pub(crate) const NOTIFICATION_ICON: &str = "/assets/icon-192.png";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SweepOutcome {
    pub(crate) matched: usize,
    pub(crate) sent: usize,
    pub(crate) failed: usize,
}

/// The once-per-minute reminder dispatcher. Each tick walks every stored
/// subscription, compares the subscriber's local wall-clock `HH:MM` against
/// their effective schedule, and pushes a budget reminder on a match.
/// Best-effort: individual failures are logged and swallowed, and a missed
/// tick is not caught up later.
#[derive(Clone)]
pub(crate) struct ReminderSweep<T, S> {
    time: T,
    sender: S,
    subscriptions: SubscriptionStore,
    budgets: BudgetStore,
    app_name: String,
}

impl<T, S> ReminderSweep<T, S>
where
    T: ports::TimeProvider,
    S: ports::PushSender,
{
    pub(crate) fn new(
        time: T,
        sender: S,
        subscriptions: SubscriptionStore,
        budgets: BudgetStore,
        app_name: String,
    ) -> Self {
        Self {
            time,
            sender,
            subscriptions,
            budgets,
            app_name,
        }
    }

    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let delay = delay_until_next_minute(self.time.now());
                self.time.sleep(delay).await;
                let outcome = self.run_tick().await;
                if outcome.matched > 0 {
                    eprintln!(
                        "reminder sweep: {} matched, {} sent, {} failed",
                        outcome.matched, outcome.sent, outcome.failed
                    );
                }
            }
        })
    }

    pub(crate) async fn run_tick(&self) -> SweepOutcome {
        let now = self.time.now();
        let entries = match self.subscriptions.list() {
            Ok(entries) => entries,
            Err(err) => {
                eprintln!("reminder sweep error: failed to list subscriptions: {err}");
                return SweepOutcome::default();
            }
        };

        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_SENDS));
        let mut outcome = SweepOutcome::default();
        let mut sends: Vec<JoinHandle<bool>> = Vec::new();

        for entry in entries {
            // One bad record must not abort the sweep for everyone else.
            let (key, record) = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    eprintln!("reminder sweep warning: skipping record: {err}");
                    continue;
                }
            };

            let timezone = schedule::timezone_or_default(record.timezone.as_deref()).to_string();
            let local = schedule::local_hhmm(now, &timezone);

            let snapshot = match self.budgets.get(&key) {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    eprintln!("reminder sweep warning: budget snapshot unreadable for {key}: {err}");
                    None
                }
            };

            let times = schedule::effective_schedule(
                record.schedule.as_deref(),
                snapshot.as_ref().and_then(|s| s.schedule.as_deref()),
            );
            if !times.iter().any(|t| *t == local) {
                continue;
            }
            outcome.matched += 1;

            let daily_budget = snapshot.map(|s| s.daily_budget).unwrap_or(0.0);
            let payload = reminder_payload(&self.app_name, daily_budget, &local);
            let payload = match serde_json::to_string(&payload) {
                Ok(payload) => payload,
                Err(err) => {
                    eprintln!("reminder sweep warning: payload encoding failed for {key}: {err}");
                    outcome.failed += 1;
                    continue;
                }
            };

            let sender = self.sender.clone();
            let semaphore = Arc::clone(&semaphore);
            let subscription_value = record.subscription;
            sends.push(tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return false;
                };
                let subscription: PushSubscription = match serde_json::from_value(subscription_value)
                {
                    Ok(subscription) => subscription,
                    Err(err) => {
                        eprintln!("reminder delivery error: invalid subscription (key {key}): {err}");
                        return false;
                    }
                };
                match sender.send(&subscription, &payload).await {
                    Ok(()) => true,
                    Err(err) => {
                        eprintln!("reminder delivery error: {err} (key {key})");
                        false
                    }
                }
            }));
        }

        for send in sends {
            match send.await {
                Ok(true) => outcome.sent += 1,
                Ok(false) => outcome.failed += 1,
                Err(err) => {
                    eprintln!("reminder sweep warning: send task panicked: {err}");
                    outcome.failed += 1;
                }
            }
        }
        outcome
    }
}

pub(crate) fn reminder_payload(
    app_name: &str,
    daily_budget: f64,
    local_time: &str,
) -> NotificationPayload {
    NotificationPayload {
        title: format!("\u{1f4b8} {app_name}"),
        body: format!("Heutiges Tagesbudget: {}", format_eur(daily_budget)),
        icon: NOTIFICATION_ICON.to_string(),
        tag: format!("daily-budget-{local_time}"),
        require_interaction: None,
        data: None,
    }
}

/// German-locale currency text: thousands separated by `.`, decimal `,`,
/// trailing euro sign.
pub(crate) fn format_eur(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    let negative = cents < 0;
    let cents = cents.unsigned_abs();
    let whole = cents / 100;
    let fraction = cents % 100;

    let digits = whole.to_string();
    let mut grouped = String::new();
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}{grouped},{fraction:02} \u{20ac}")
}

/// Time until the next wall-clock minute boundary, so ticks line up with the
/// `HH:MM` resolution of schedules.
pub(crate) fn delay_until_next_minute(now: OffsetDateTime) -> Duration {
    let into_minute =
        Duration::from_secs(u64::from(now.second())) + Duration::from_nanos(u64::from(now.nanosecond()));
    Duration::from_secs(60) - into_minute
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::adapters::FsBlobStore;
    use crate::ports::BlobStore;
    use crate::records::{BudgetSnapshotRecord, SubscriptionRecord, epoch_millis};
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use time::format_description::well_known::Rfc3339;

    #[derive(Clone)]
    struct FixedTime {
        now: OffsetDateTime,
    }

    impl FixedTime {
        fn at(raw: &str) -> Self {
            Self {
                now: OffsetDateTime::parse(raw, &Rfc3339).expect("parse now"),
            }
        }
    }

    impl ports::TimeProvider for FixedTime {
        type Sleep<'a>
            = std::future::Ready<()>
        where
            Self: 'a;

        fn now(&self) -> OffsetDateTime {
            self.now
        }

        fn sleep<'a>(&'a self, _duration: Duration) -> Self::Sleep<'a> {
            std::future::ready(())
        }
    }

    #[derive(Debug)]
    struct TestSendError;

    impl std::fmt::Display for TestSendError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("test send error")
        }
    }

    #[derive(Clone, Default)]
    struct TestSender {
        sent: Arc<Mutex<Vec<(String, String)>>>,
        fail_endpoint: Option<String>,
    }

    impl ports::PushSender for TestSender {
        type Error = TestSendError;
        type Fut<'a>
            = std::future::Ready<Result<(), Self::Error>>
        where
            Self: 'a;

        fn send<'a>(
            &'a self,
            subscription: &'a PushSubscription,
            payload: &'a str,
        ) -> Self::Fut<'a> {
            if self.fail_endpoint.as_deref() == Some(subscription.endpoint.as_str()) {
                return std::future::ready(Err(TestSendError));
            }
            self.sent
                .lock()
                .expect("sent lock")
                .push((subscription.endpoint.clone(), payload.to_string()));
            std::future::ready(Ok(()))
        }
    }

    struct TestStores {
        dir: PathBuf,
        subscriptions: SubscriptionStore,
        budgets: BudgetStore,
    }

    impl Drop for TestStores {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }

    fn create_stores(label: &str) -> TestStores {
        let dir = std::env::temp_dir().join(format!(
            "dailybudget-{label}-{}-{:04x}",
            std::process::id(),
            rand::random::<u16>()
        ));
        let subscriptions =
            SubscriptionStore::new(Arc::new(FsBlobStore::new(dir.join("subscriptions"))));
        let budgets = BudgetStore::new(Arc::new(FsBlobStore::new(dir.join("budgets"))));
        TestStores {
            dir,
            subscriptions,
            budgets,
        }
    }

    fn subscriber(endpoint: &str, timezone: &str, times: &[&str]) -> SubscriptionRecord {
        SubscriptionRecord {
            endpoint: endpoint.to_string(),
            subscription: json!({"endpoint": endpoint, "keys": {"p256dh": "p", "auth": "a"}}),
            timezone: Some(timezone.to_string()),
            schedule: if times.is_empty() {
                None
            } else {
                Some(times.iter().map(|t| t.to_string()).collect())
            },
            created_at: epoch_millis(OffsetDateTime::now_utc()),
            updated_at: None,
        }
    }

    fn sweep<S: ports::PushSender>(
        stores: &TestStores,
        time: FixedTime,
        sender: S,
    ) -> ReminderSweep<FixedTime, S> {
        ReminderSweep::new(
            time,
            sender,
            stores.subscriptions.clone(),
            stores.budgets.clone(),
            "Daily Budget".to_string(),
        )
    }

    #[tokio::test]
    async fn run_tick__should_send_exactly_on_the_matching_local_minute() {
        // Given: Berlin is UTC+1 on 2025-01-15, so 08:00Z is 09:00 local
        let stores = create_stores("sweep-match");
        stores
            .subscriptions
            .set(
                "k1",
                &subscriber("https://push.example/1", "Europe/Berlin", &["09:00"]),
            )
            .expect("set subscriber");
        let sender = TestSender::default();

        // When / Then: one minute early, no send
        let early = sweep(&stores, FixedTime::at("2025-01-15T07:59:00Z"), sender.clone());
        assert_eq!(early.run_tick().await, SweepOutcome::default());

        // When / Then: the matching minute sends once
        let matching = sweep(&stores, FixedTime::at("2025-01-15T08:00:00Z"), sender.clone());
        let outcome = matching.run_tick().await;
        assert_eq!(
            outcome,
            SweepOutcome {
                matched: 1,
                sent: 1,
                failed: 0
            }
        );

        // When / Then: one minute late, no further send
        let late = sweep(&stores, FixedTime::at("2025-01-15T08:01:00Z"), sender.clone());
        assert_eq!(late.run_tick().await, SweepOutcome::default());

        let sent = sender.sent.lock().expect("sent lock");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "https://push.example/1");
    }

    #[tokio::test]
    async fn run_tick__should_build_payload_from_latest_budget_snapshot() {
        // Given
        let stores = create_stores("sweep-payload");
        stores
            .subscriptions
            .set(
                "k1",
                &subscriber("https://push.example/1", "Europe/Berlin", &["09:00"]),
            )
            .expect("set subscriber");
        stores
            .budgets
            .set(
                "k1",
                &BudgetSnapshotRecord {
                    daily_budget: 1234.5,
                    remaining_budget: 9876.0,
                    remaining_days: 8,
                    schedule: None,
                    timezone: "Europe/Berlin".to_string(),
                    updated_at: 0,
                },
            )
            .expect("set snapshot");
        let sender = TestSender::default();

        // When
        let outcome = sweep(&stores, FixedTime::at("2025-01-15T08:00:00Z"), sender.clone())
            .run_tick()
            .await;

        // Then
        assert_eq!(outcome.sent, 1);
        let sent = sender.sent.lock().expect("sent lock");
        let payload: serde_json::Value = serde_json::from_str(&sent[0].1).expect("parse payload");
        assert_eq!(payload["title"], "\u{1f4b8} Daily Budget");
        assert_eq!(payload["body"], "Heutiges Tagesbudget: 1.234,50 \u{20ac}");
        assert_eq!(payload["tag"], "daily-budget-09:00");
    }

    #[tokio::test]
    async fn run_tick__should_put_the_configured_app_name_in_the_title() {
        // Given
        let stores = create_stores("sweep-appname");
        stores
            .subscriptions
            .set(
                "k1",
                &subscriber("https://push.example/1", "Europe/Berlin", &["09:00"]),
            )
            .expect("set subscriber");
        let sender = TestSender::default();

        // When
        let outcome = ReminderSweep::new(
            FixedTime::at("2025-01-15T08:00:00Z"),
            sender.clone(),
            stores.subscriptions.clone(),
            stores.budgets.clone(),
            "Haushaltsgeld".to_string(),
        )
        .run_tick()
        .await;

        // Then
        assert_eq!(outcome.sent, 1);
        let sent = sender.sent.lock().expect("sent lock");
        let payload: serde_json::Value = serde_json::from_str(&sent[0].1).expect("parse payload");
        assert_eq!(payload["title"], "\u{1f4b8} Haushaltsgeld");
    }

    #[tokio::test]
    async fn run_tick__should_fall_back_to_budget_mirror_then_default_schedule() {
        // Given: no subscription schedule, mirror says 09:00
        let stores = create_stores("sweep-fallback");
        stores
            .subscriptions
            .set(
                "mirror",
                &subscriber("https://push.example/mirror", "Europe/Berlin", &[]),
            )
            .expect("set subscriber");
        stores
            .budgets
            .set(
                "mirror",
                &BudgetSnapshotRecord {
                    daily_budget: 5.0,
                    remaining_budget: 10.0,
                    remaining_days: 2,
                    schedule: Some(vec!["09:00".to_string()]),
                    timezone: "Europe/Berlin".to_string(),
                    updated_at: 0,
                },
            )
            .expect("set snapshot");
        // And a subscriber with neither schedule, relying on the 09:00 default
        stores
            .subscriptions
            .set(
                "default",
                &subscriber("https://push.example/default", "Europe/Berlin", &[]),
            )
            .expect("set subscriber");
        let sender = TestSender::default();

        // When
        let outcome = sweep(&stores, FixedTime::at("2025-01-15T08:00:00Z"), sender.clone())
            .run_tick()
            .await;

        // Then: both fire at 09:00 local
        assert_eq!(outcome.matched, 2);
        assert_eq!(outcome.sent, 2);
    }

    #[tokio::test]
    async fn run_tick__should_isolate_per_subscriber_failures() {
        // Given: three due subscribers, the second one's endpoint is dead
        let stores = create_stores("sweep-isolation");
        for (key, endpoint) in [
            ("k1", "https://push.example/1"),
            ("k2", "https://push.example/2"),
            ("k3", "https://push.example/3"),
        ] {
            stores
                .subscriptions
                .set(key, &subscriber(endpoint, "Europe/Berlin", &["09:00"]))
                .expect("set subscriber");
        }
        let sender = TestSender {
            fail_endpoint: Some("https://push.example/2".to_string()),
            ..TestSender::default()
        };

        // When
        let outcome = sweep(&stores, FixedTime::at("2025-01-15T08:00:00Z"), sender.clone())
            .run_tick()
            .await;

        // Then: every match is accounted for as either sent or failed
        assert_eq!(outcome.matched, 3);
        assert_eq!(outcome.sent, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.sent + outcome.failed, outcome.matched);
        let sent = sender.sent.lock().expect("sent lock");
        let endpoints: Vec<&str> = sent.iter().map(|(endpoint, _)| endpoint.as_str()).collect();
        assert!(endpoints.contains(&"https://push.example/1"));
        assert!(endpoints.contains(&"https://push.example/3"));
    }

    #[tokio::test]
    async fn run_tick__should_skip_corrupt_records_without_aborting() {
        // Given
        let stores = create_stores("sweep-corrupt");
        stores
            .subscriptions
            .set(
                "good",
                &subscriber("https://push.example/good", "Europe/Berlin", &["09:00"]),
            )
            .expect("set subscriber");
        let raw_store = FsBlobStore::new(stores.dir.join("subscriptions"));
        raw_store.set("bad", "{torn write").expect("set corrupt");
        let sender = TestSender::default();

        // When
        let outcome = sweep(&stores, FixedTime::at("2025-01-15T08:00:00Z"), sender.clone())
            .run_tick()
            .await;

        // Then
        assert_eq!(outcome.sent, 1);
    }

    #[test]
    fn format_eur__should_render_german_locale() {
        // Then
        assert_eq!(format_eur(0.0), "0,00 \u{20ac}");
        assert_eq!(format_eur(9.9), "9,90 \u{20ac}");
        assert_eq!(format_eur(1234.5), "1.234,50 \u{20ac}");
        assert_eq!(format_eur(1_234_567.89), "1.234.567,89 \u{20ac}");
        assert_eq!(format_eur(-42.01), "-42,01 \u{20ac}");
    }

    #[test]
    fn delay_until_next_minute__should_align_to_the_boundary() {
        // Given
        let base = OffsetDateTime::parse("2025-01-15T08:00:00Z", &Rfc3339).expect("parse");

        // Then
        assert_eq!(delay_until_next_minute(base), Duration::from_secs(60));
        assert_eq!(
            delay_until_next_minute(base + time::Duration::seconds(59)),
            Duration::from_secs(1)
        );
        assert_eq!(
            delay_until_next_minute(base + time::Duration::milliseconds(500)),
            Duration::from_millis(59_500)
        );
    }
}
