//! Library entrypoint for pricewatch.
//!
//! The binary only wires settings into [`AppState`] and the [`services::engine::Engine`];
//! integration tests under `tests/` build the same pieces around in-memory fakes.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod templates;

pub mod controllers;
pub mod routes;

use services::{
    alert_monitor::AlertMonitor,
    conversation::Conversation,
    digest_service::DigestService,
    engine::Engine,
    formatting::Messages,
    market_data::MarketGateway,
    notifier::NotificationHub,
    sessions::SessionStore,
    store::AlertStore,
};

#[derive(Clone)]
pub struct AppState {
    pub settings: config::Settings,
    pub store: Arc<dyn AlertStore>,
    pub gateway: MarketGateway,
    pub hub: Arc<NotificationHub>,
    pub messages: Messages,
    pub conversation: Arc<Conversation>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(
        settings: config::Settings,
        store: Arc<dyn AlertStore>,
        gateway: MarketGateway,
        hub: Arc<NotificationHub>,
        messages: Messages,
    ) -> Self {
        let conversation = Arc::new(Conversation::new(gateway.clone(), store.clone(), messages.clone()));
        let sessions = Arc::new(SessionStore::new(settings.session_ttl()));

        Self {
            settings,
            store,
            gateway,
            hub,
            messages,
            conversation,
            sessions,
        }
    }

    /// Evaluation and digest loops sharing this state's store, gateway and hub.
    pub fn engine(&self) -> Engine {
        let monitor = AlertMonitor::new(
            self.gateway.clone(),
            self.store.clone(),
            self.hub.clone(),
            self.messages.clone(),
        );
        let digests = DigestService::new(
            self.gateway.clone(),
            self.store.clone(),
            self.hub.clone(),
            self.messages.clone(),
            self.settings.digest_stock_symbols.clone(),
        );

        Engine::new()
            .with_job(Arc::new(monitor), self.settings.alert_schedule())
            .with_job(Arc::new(digests), self.settings.digest_schedule())
            .with_job(self.sessions.clone(), self.settings.session_sweep_schedule())
    }
}
