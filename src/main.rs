use std::{net::SocketAddr, sync::Arc};

use tracing_subscriber::EnvFilter;

use pricewatch::{
    AppState,
    config::{self, StoreBackend},
    routes,
    services::{
        alpha_vantage::AlphaVantageClient,
        coingecko::CoinGeckoClient,
        formatting::Messages,
        market_data::MarketGateway,
        memory_store::MemoryStore,
        mongo_store::MongoStore,
        notifier::NotificationHub,
        store::AlertStore,
    },
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = config::load();

    let store: Arc<dyn AlertStore> = match settings.store_backend {
        StoreBackend::Mongo => Arc::new(
            MongoStore::connect(&settings.mongodb_uri, &settings.mongodb_db)
                .await
                .expect("Failed to connect to MongoDB"),
        ),
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let http = reqwest::Client::builder()
        .timeout(settings.http_timeout())
        .build()
        .expect("Failed to build HTTP client");

    if settings.alpha_vantage_api_key.trim().is_empty() {
        tracing::warn!("ALPHA_VANTAGE_API_KEY is not set; stock lookups will fail");
    }

    let gateway = MarketGateway::new(
        Arc::new(CoinGeckoClient::new(http.clone(), &settings.coingecko_api_url)),
        Arc::new(AlphaVantageClient::new(
            http,
            &settings.alpha_vantage_api_url,
            settings.alpha_vantage_api_key.clone(),
        )),
    );

    let messages = Messages::standard().expect("Failed to compile message templates");
    let hub = Arc::new(NotificationHub::default());

    let state = AppState::new(settings.clone(), store, gateway, hub, messages);

    let engine = state.engine();
    engine.start().await;

    let addr = SocketAddr::from((
        settings
            .host
            .parse::<std::net::IpAddr>()
            .expect("HOST must be an IP address"),
        settings.port,
    ));
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.expect("Failed to bind");
    let app = routes::app(state);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server error");
    }

    engine.stop().await;
    tracing::info!("shutdown complete");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
