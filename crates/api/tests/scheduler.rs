//! Tests for the background scheduler running on real (short) intervals.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use hostwatch_api::background::Scheduler;
use hostwatch_core::alert::{
    Alert, AlertHistory, AlertKey, AlertStatistics, AlertStatus, AlertTransition, NewAlert,
    SystemEvent,
};
use hostwatch_core::alerting::AlertManager;
use hostwatch_core::metric::MetricKind;
use hostwatch_core::ring_buffer::MetricHistory;
use hostwatch_core::rule::{AlertRule, NewAlertRule, Operator, Severity};
use hostwatch_core::store::{AlertStore, MemoryStore, StoreResult};
use hostwatch_core::types::{DbId, Timestamp};

fn cpu_rule(threshold: f64) -> NewAlertRule {
    NewAlertRule {
        name: "CPU high".into(),
        metric_type: MetricKind::Cpu,
        operator: Operator::Gt,
        threshold,
        duration_secs: 0,
        severity: Severity::Warning,
        enabled: true,
        hostname: None,
        description: String::new(),
    }
}

fn scheduler(app: &common::TestApp) -> Scheduler {
    Scheduler::new(app.alerts.clone(), app.history.clone(), app.sampler.clone())
        .with_sample_interval(Duration::from_millis(20))
        .with_evaluation_interval(Duration::from_millis(50))
        .with_call_timeout(Duration::from_secs(1))
}

#[tokio::test]
async fn loops_fill_history_and_open_alerts() {
    let app = common::build_test_app();
    app.store.create_rule(cpu_rule(80.0)).await.unwrap();
    app.sampler.set_cpu(92.0);

    let handle = scheduler(&app).start(CancellationToken::new());
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(handle.shutdown().await);

    assert!(app.history.snapshot(MetricKind::Cpu).len() >= 3);
    assert_eq!(app.store.alert_count().await, 1);
    let alert = app.alerts.alerts(None, 10, 0).await.unwrap().remove(0);
    assert_eq!(alert.value, 92.0);
}

#[tokio::test]
async fn evaluation_runs_immediately_on_start() {
    let app = common::build_test_app();
    app.store.create_rule(cpu_rule(50.0)).await.unwrap();
    app.sampler.set_cpu(60.0);

    let handle = Scheduler::new(app.alerts.clone(), app.history.clone(), app.sampler.clone())
        .with_sample_interval(Duration::from_secs(60))
        .with_evaluation_interval(Duration::from_secs(60))
        .start(CancellationToken::new());
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.shutdown().await;

    assert_eq!(app.store.alert_count().await, 1);
}

#[tokio::test]
async fn sampling_failures_do_not_stop_the_loop() {
    let app = common::build_test_app();
    app.sampler.set_failing(true);

    let handle = scheduler(&app).start(CancellationToken::new());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(app.history.snapshot(MetricKind::Cpu).is_empty());

    app.sampler.set_failing(false);
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.shutdown().await;

    assert!(!app.history.snapshot(MetricKind::Cpu).is_empty());
}

#[tokio::test]
async fn cancellation_stops_new_ticks() {
    let app = common::build_test_app();
    let cancel = CancellationToken::new();
    let handle = scheduler(&app).start(cancel.clone());
    tokio::time::sleep(Duration::from_millis(60)).await;

    cancel.cancel();
    assert!(handle.shutdown().await);
    let calls = app.sampler.calls();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(app.sampler.calls(), calls);
}

#[tokio::test]
async fn shared_history_is_readable_while_sampling() {
    let app = common::build_test_app();
    let handle = scheduler(&app).start(CancellationToken::new());

    let history = Arc::clone(&app.history);
    let reader = tokio::spawn(async move {
        let mut max_seen = 0;
        for _ in 0..20 {
            let len = history.snapshot(MetricKind::Memory).len();
            assert!(len <= 20);
            max_seen = max_seen.max(len);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        max_seen
    });

    let max_seen = reader.await.unwrap();
    handle.shutdown().await;
    assert!(max_seen > 0);
}

// ---------------------------------------------------------------------------
// Misbehaving stores
// ---------------------------------------------------------------------------

/// Notifies when dropped, i.e. when the call holding it is cancelled.
struct DropSignal<'a>(&'a Notify);

impl Drop for DropSignal<'_> {
    fn drop(&mut self) {
        self.0.notify_one();
    }
}

/// A [`MemoryStore`] with scripted misbehaviour.
#[derive(Default)]
struct ScriptedStore {
    inner: MemoryStore,
    /// Panic on the next rule listing only.
    panic_next_rule_listing: AtomicBool,
    /// Never answer rule listings.
    stall_rule_listing: AtomicBool,
    /// Never answer config reads.
    stall_config: AtomicBool,
    /// Notified when a stalled call starts.
    stalled: Notify,
    /// Notified when a stalled call is dropped.
    stall_dropped: Notify,
}

impl ScriptedStore {
    async fn stall(&self) {
        let _signal = DropSignal(&self.stall_dropped);
        self.stalled.notify_one();
        std::future::pending::<()>().await;
    }
}

#[async_trait]
impl AlertStore for ScriptedStore {
    async fn open_alert(&self, alert: NewAlert) -> StoreResult<Alert> {
        self.inner.open_alert(alert).await
    }
    async fn refresh_alert(
        &self,
        id: DbId,
        value: f64,
        at: Timestamp,
    ) -> StoreResult<Option<Alert>> {
        self.inner.refresh_alert(id, value, at).await
    }
    async fn transition_alert(&self, change: &AlertTransition) -> StoreResult<Option<Alert>> {
        self.inner.transition_alert(change).await
    }
    async fn get_active_alert_by_key(&self, key: &AlertKey) -> StoreResult<Option<Alert>> {
        self.inner.get_active_alert_by_key(key).await
    }
    async fn get_alert_by_id(&self, id: DbId) -> StoreResult<Option<Alert>> {
        self.inner.get_alert_by_id(id).await
    }
    async fn list_alerts(
        &self,
        status: Option<AlertStatus>,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Alert>> {
        self.inner.list_alerts(status, limit, offset).await
    }
    async fn alert_statistics(&self, since: Timestamp) -> StoreResult<AlertStatistics> {
        self.inner.alert_statistics(since).await
    }
    async fn list_alert_history(&self, alert_id: DbId) -> StoreResult<Vec<AlertHistory>> {
        self.inner.list_alert_history(alert_id).await
    }
    async fn list_system_events(&self, limit: i64, offset: i64) -> StoreResult<Vec<SystemEvent>> {
        self.inner.list_system_events(limit, offset).await
    }
    async fn list_rules_for_host(&self, hostname: &str) -> StoreResult<Vec<AlertRule>> {
        if self.panic_next_rule_listing.swap(false, Ordering::SeqCst) {
            panic!("rule listing blew up");
        }
        if self.stall_rule_listing.load(Ordering::SeqCst) {
            self.stall().await;
        }
        self.inner.list_rules_for_host(hostname).await
    }
    async fn list_rules(&self) -> StoreResult<Vec<AlertRule>> {
        self.inner.list_rules().await
    }
    async fn get_rule(&self, id: DbId) -> StoreResult<Option<AlertRule>> {
        self.inner.get_rule(id).await
    }
    async fn create_rule(&self, rule: NewAlertRule) -> StoreResult<AlertRule> {
        self.inner.create_rule(rule).await
    }
    async fn update_rule(&self, rule: &AlertRule) -> StoreResult<Option<AlertRule>> {
        self.inner.update_rule(rule).await
    }
    async fn delete_rule(&self, id: DbId) -> StoreResult<bool> {
        self.inner.delete_rule(id).await
    }
    async fn get_config_value(&self, key: &str) -> StoreResult<Option<String>> {
        if self.stall_config.load(Ordering::SeqCst) {
            self.stall().await;
        }
        self.inner.get_config_value(key).await
    }
    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }
}

/// Scheduler over `store` with the default (long) store call timeout, so a
/// stalled call outlives the shutdown grace period.
fn scripted_scheduler(store: &Arc<ScriptedStore>, cpu: f64) -> Scheduler {
    let sampler = Arc::new(common::FakeSampler::new());
    sampler.set_cpu(cpu);
    Scheduler::new(
        Arc::new(AlertManager::new(store.clone())),
        Arc::new(MetricHistory::default()),
        sampler,
    )
    .with_sample_interval(Duration::from_millis(20))
    .with_call_timeout(Duration::from_secs(1))
}

#[tokio::test]
async fn panicking_tick_does_not_stop_evaluation() {
    let store = Arc::new(ScriptedStore::default());
    store.create_rule(cpu_rule(80.0)).await.unwrap();
    store.panic_next_rule_listing.store(true, Ordering::SeqCst);

    let handle = scripted_scheduler(&store, 92.0)
        .with_evaluation_interval(Duration::from_millis(50))
        .start(CancellationToken::new());
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(handle.shutdown().await);

    assert!(!store.panic_next_rule_listing.load(Ordering::SeqCst));
    assert_eq!(store.inner.alert_count().await, 1);
}

#[tokio::test]
async fn shutdown_aborts_ticks_that_outlive_the_grace_period() {
    let store = Arc::new(ScriptedStore::default());
    store.create_rule(cpu_rule(80.0)).await.unwrap();
    store.stall_rule_listing.store(true, Ordering::SeqCst);

    let handle = scripted_scheduler(&store, 92.0)
        .with_evaluation_interval(Duration::from_millis(50))
        .start(CancellationToken::new());
    tokio::time::timeout(Duration::from_secs(1), store.stalled.notified())
        .await
        .expect("evaluation tick never reached the store");

    assert!(!handle.shutdown().await);
    tokio::time::timeout(Duration::from_secs(1), store.stall_dropped.notified())
        .await
        .expect("stalled tick kept running after shutdown");
}

#[tokio::test]
async fn cancellation_interrupts_the_startup_interval_read() {
    let store = Arc::new(ScriptedStore::default());
    store.stall_config.store(true, Ordering::SeqCst);

    let handle = scripted_scheduler(&store, 10.0).start(CancellationToken::new());
    tokio::time::timeout(Duration::from_secs(1), store.stalled.notified())
        .await
        .expect("evaluation loop never read its interval");

    assert!(handle.shutdown().await);
    assert_eq!(store.inner.alert_count().await, 0);
}
