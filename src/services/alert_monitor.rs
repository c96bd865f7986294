//! Alert evaluation loop.
//!
//! Every cycle loads the live active set, prices each alert and fires the
//! ones whose condition holds. Delivery comes first and deactivation second:
//! a crash in between re-fires the alert once on restart instead of losing
//! the notification.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{EngineError, MarketError},
    models::Alert,
    services::{
        formatting::Messages,
        market_data::MarketGateway,
        notifier::Notifier,
        scheduler::{CycleReport, PeriodicJob},
        store::AlertStore,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AlertOutcome {
    Fired,
    NotTriggered,
    Skipped,
    Failed,
}

pub struct AlertMonitor {
    gateway: MarketGateway,
    store: Arc<dyn AlertStore>,
    notifier: Arc<dyn Notifier>,
    messages: Messages,
}

impl AlertMonitor {
    pub fn new(
        gateway: MarketGateway,
        store: Arc<dyn AlertStore>,
        notifier: Arc<dyn Notifier>,
        messages: Messages,
    ) -> Self {
        Self {
            gateway,
            store,
            notifier,
            messages,
        }
    }

    /// One pass over all active alerts, oldest first, one at a time.
    pub async fn check_alerts(&self, cancel: &CancellationToken) -> Result<CycleReport, EngineError> {
        let alerts = self.store.list_all_active_alerts().await?;
        let mut report = CycleReport::default();

        // one quote per symbol per cycle
        let mut prices: HashMap<String, Result<f64, MarketError>> = HashMap::new();

        for alert in &alerts {
            if cancel.is_cancelled() {
                tracing::info!(remaining = alerts.len() - report.checked, "alert cycle interrupted");
                break;
            }
            report.checked += 1;

            let price = match prices.get(&alert.symbol) {
                Some(p) => p.clone(),
                None => {
                    let p = self.gateway.fetch(&alert.symbol).await.map(|s| s.price);
                    prices.insert(alert.symbol.clone(), p.clone());
                    p
                }
            };

            match self.evaluate(alert, price).await {
                AlertOutcome::Fired => report.fired += 1,
                AlertOutcome::NotTriggered => {}
                AlertOutcome::Skipped => report.skipped += 1,
                AlertOutcome::Failed => report.failed += 1,
            }
        }

        Ok(report)
    }

    async fn evaluate(&self, alert: &Alert, price: Result<f64, MarketError>) -> AlertOutcome {
        let price = match price {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!(alert_id = %alert.id, symbol = %alert.symbol, error = %e, "no price, skipping");
                return AlertOutcome::Skipped;
            }
        };

        if !alert.is_triggered_by(price) {
            return AlertOutcome::NotTriggered;
        }

        let text = match self.messages.alert_triggered(alert, price) {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(alert_id = %alert.id, error = %e, "could not render alert notification");
                return AlertOutcome::Failed;
            }
        };

        if let Err(e) = self.notifier.send(alert.user_id, text).await {
            // stays active, retried next cycle
            tracing::warn!(alert_id = %alert.id, user_id = alert.user_id, error = %e, "alert notification failed");
            return AlertOutcome::Failed;
        }

        match self.store.deactivate_alert(alert.id, alert.user_id).await {
            Ok(true) => {
                tracing::info!(
                    alert_id = %alert.id,
                    user_id = alert.user_id,
                    symbol = %alert.symbol,
                    price,
                    target = alert.target_price,
                    direction = %alert.direction,
                    "alert fired"
                );
                AlertOutcome::Fired
            }
            Ok(false) => {
                // deleted or deactivated concurrently; the notification already went out
                tracing::info!(alert_id = %alert.id, "alert was no longer active after notifying");
                AlertOutcome::Fired
            }
            Err(e) => {
                tracing::warn!(alert_id = %alert.id, error = %e, "could not deactivate fired alert");
                AlertOutcome::Failed
            }
        }
    }
}

#[async_trait]
impl PeriodicJob for AlertMonitor {
    fn name(&self) -> &'static str {
        "alert-monitor"
    }

    async fn run_cycle(&self, cancel: &CancellationToken) -> Result<CycleReport, EngineError> {
        self.check_alerts(cancel).await
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::oid::ObjectId;

    use super::*;
    use crate::{
        error::StoreError,
        models::{Direction, Interaction, NewAlert, NewInteraction, Subscription, TargetPrice, Topic, UserId},
        services::{
            market_data::fakes::{ScriptedCrypto, ScriptedEquity, gateway},
            memory_store::MemoryStore,
            notifier::fakes::RecordingNotifier,
        },
    };

    struct Fixture {
        monitor: AlertMonitor,
        store: Arc<MemoryStore>,
        notifier: Arc<RecordingNotifier>,
        crypto: Arc<ScriptedCrypto>,
        equity: Arc<ScriptedEquity>,
    }

    fn fixture() -> Fixture {
        let (gw, crypto, equity) = gateway();
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let monitor = AlertMonitor::new(gw, store.clone(), notifier.clone(), Messages::standard().unwrap());
        Fixture {
            monitor,
            store,
            notifier,
            crypto,
            equity,
        }
    }

    async fn add(store: &dyn AlertStore, user: UserId, symbol: &str, target: f64, dir: Direction) -> Alert {
        store
            .create_alert(NewAlert::new(user, symbol, TargetPrice::new(target).unwrap(), dir))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn bitcoin_alert_fires_exactly_once() {
        let f = fixture();
        add(f.store.as_ref(), 1, "bitcoin", 50_000.0, Direction::Above).await;
        let cancel = CancellationToken::new();

        f.crypto.set_price("bitcoin", 51_000.0);
        let report = f.monitor.check_alerts(&cancel).await.unwrap();
        assert_eq!(report.fired, 1);

        let sent = f.notifier.sent_to(1);
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("BITCOIN"));
        assert!(sent[0].contains("$50,000.00"));
        assert!(sent[0].contains("above"));
        assert!(!f.store.all_alerts()[0].active);

        f.crypto.set_price("bitcoin", 52_000.0);
        let report = f.monitor.check_alerts(&cancel).await.unwrap();
        assert_eq!(report.checked, 0);
        assert_eq!(f.notifier.sent_to(1).len(), 1);
    }

    #[tokio::test]
    async fn boundary_price_fires_both_directions() {
        let f = fixture();
        add(f.store.as_ref(), 1, "bitcoin", 50_000.0, Direction::Above).await;
        add(f.store.as_ref(), 2, "bitcoin", 50_000.0, Direction::Below).await;
        f.crypto.set_price("bitcoin", 50_000.0);

        let report = f.monitor.check_alerts(&CancellationToken::new()).await.unwrap();
        assert_eq!(report.fired, 2);
        // same symbol is priced once per cycle
        assert_eq!(f.crypto.calls(), 1);
    }

    #[tokio::test]
    async fn untriggered_alert_stays_quiet() {
        let f = fixture();
        add(f.store.as_ref(), 1, "bitcoin", 50_000.0, Direction::Above).await;
        add(f.store.as_ref(), 1, "aapl", 100.0, Direction::Below).await;
        f.crypto.set_price("bitcoin", 49_999.0);
        f.equity.set_price("AAPL", 150.0);

        let report = f.monitor.check_alerts(&CancellationToken::new()).await.unwrap();
        assert_eq!(report, CycleReport { checked: 2, ..CycleReport::default() });
        assert!(f.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_is_isolated_to_its_alert() {
        let f = fixture();
        add(f.store.as_ref(), 1, "ethereum", 10.0, Direction::Above).await;
        add(f.store.as_ref(), 2, "bitcoin", 50_000.0, Direction::Above).await;
        f.crypto.fail("ethereum");
        f.crypto.set_price("bitcoin", 60_000.0);

        let report = f.monitor.check_alerts(&CancellationToken::new()).await.unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.fired, 1);
        assert_eq!(f.notifier.sent_to(2).len(), 1);

        let active = f.store.list_all_active_alerts().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].symbol, "ethereum");
    }

    #[tokio::test]
    async fn failed_delivery_keeps_alert_for_next_cycle() {
        let f = fixture();
        add(f.store.as_ref(), 1, "bitcoin", 50_000.0, Direction::Above).await;
        add(f.store.as_ref(), 2, "bitcoin", 50_000.0, Direction::Above).await;
        f.crypto.set_price("bitcoin", 51_000.0);
        f.notifier.fail_for(1);

        let report = f.monitor.check_alerts(&CancellationToken::new()).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.fired, 1);
        assert_eq!(f.store.list_all_active_alerts().await.unwrap().len(), 1);

        f.notifier.recover(1);
        let report = f.monitor.check_alerts(&CancellationToken::new()).await.unwrap();
        assert_eq!(report.fired, 1);
        assert_eq!(f.notifier.sent_to(1).len(), 1);
        assert_eq!(f.notifier.sent_to(2).len(), 1);
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_next_alert() {
        let f = fixture();
        add(f.store.as_ref(), 1, "bitcoin", 1.0, Direction::Above).await;
        f.crypto.set_price("bitcoin", 2.0);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = f.monitor.check_alerts(&cancel).await.unwrap();
        assert_eq!(report.checked, 0);
        assert!(f.notifier.sent().is_empty());
    }

    /// Delegates to a memory store but cannot deactivate.
    struct StuckStore(MemoryStore);

    #[async_trait]
    impl AlertStore for StuckStore {
        async fn create_alert(&self, a: NewAlert) -> Result<Alert, StoreError> {
            self.0.create_alert(a).await
        }
        async fn list_active_alerts_for_user(&self, u: UserId) -> Result<Vec<Alert>, StoreError> {
            self.0.list_active_alerts_for_user(u).await
        }
        async fn list_all_active_alerts(&self) -> Result<Vec<Alert>, StoreError> {
            self.0.list_all_active_alerts().await
        }
        async fn deactivate_alert(&self, _: ObjectId, _: UserId) -> Result<bool, StoreError> {
            Err(StoreError::Backend("write timeout".to_string()))
        }
        async fn delete_alert(&self, id: ObjectId, u: UserId) -> Result<bool, StoreError> {
            self.0.delete_alert(id, u).await
        }
        async fn toggle_subscription(&self, u: UserId, t: Topic) -> Result<Subscription, StoreError> {
            self.0.toggle_subscription(u, t).await
        }
        async fn list_active_subscriptions(&self) -> Result<Vec<Subscription>, StoreError> {
            self.0.list_active_subscriptions().await
        }
        async fn list_user_subscriptions(&self, u: UserId) -> Result<Vec<Subscription>, StoreError> {
            self.0.list_user_subscriptions(u).await
        }
        async fn save_interaction(&self, i: NewInteraction) -> Result<Interaction, StoreError> {
            self.0.save_interaction(i).await
        }
        async fn list_interactions(&self, u: UserId, n: usize) -> Result<Vec<Interaction>, StoreError> {
            self.0.list_interactions(u, n).await
        }
    }

    #[tokio::test]
    async fn store_write_failure_does_not_abort_cycle() {
        let (gw, crypto, _equity) = gateway();
        let store = Arc::new(StuckStore(MemoryStore::new()));
        let notifier = Arc::new(RecordingNotifier::default());
        let monitor = AlertMonitor::new(gw, store.clone(), notifier.clone(), Messages::standard().unwrap());

        add(store.as_ref(), 1, "bitcoin", 1.0, Direction::Above).await;
        add(store.as_ref(), 2, "ethereum", 1.0, Direction::Above).await;
        crypto.set_price("bitcoin", 2.0);
        crypto.set_price("ethereum", 2.0);

        let report = monitor.check_alerts(&CancellationToken::new()).await.unwrap();
        assert_eq!(report.checked, 2);
        assert_eq!(report.failed, 2);
        assert_eq!(notifier.sent().len(), 2);
    }
}
