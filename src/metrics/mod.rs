
use autometrics::prometheus_exporter;
use lazy_static::lazy_static;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use warp::Filter;
use warp::Rejection;
use warp::Reply;

lazy_static! {
    pub static ref ACTIVE_SUBSCRIPTIONS: IntGauge = IntGauge::new(
        "active_subscriptions",
        "Number of subscriptions currently registered with the broker"
    )
    .expect("metric can not be created");

    pub static ref ACTIVE_WATCH_SESSIONS: IntGauge = IntGauge::new(
        "active_watch_sessions",
        "Number of open WatchTodos streams"
    )
    .expect("metric can not be created");

    pub static ref PUBLISHED_EVENTS: IntCounterVec = IntCounterVec::new(
        Opts::new("published_events", "Todo change events published to the broker"),
        &["event_type"]
    )
    .expect("metric can not be created");

    pub static ref SLOW_CONSUMER_EVICTIONS: IntCounter = IntCounter::new(
        "slow_consumer_evictions",
        "Subscriptions evicted for not accepting a record within the timeout"
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

pub(crate) fn register_custom_metrics(registry: &Registry) {
    registry
        .register(Box::new(ACTIVE_SUBSCRIPTIONS.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(ACTIVE_WATCH_SESSIONS.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(PUBLISHED_EVENTS.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(SLOW_CONSUMER_EVICTIONS.clone()))
        .expect("collector can be registered");
}

/// Serves `/metrics` until the shutdown signal fires.
pub async fn start_server(
    port: u16,
    mut shutdown_signal: watch::Receiver<()>,
) {
    register_custom_metrics(&REGISTRY);

    let metrics_route = warp::path!("metrics").and_then(metrics_handler);

    info!("Prometheus metrics exposed on port {}", port);
    let (_, server) =
        warp::serve(metrics_route).bind_with_graceful_shutdown(([0, 0, 0, 0], port), async move {
            let _ = shutdown_signal.changed().await;
        });
    server.await;
}

async fn metrics_handler() -> Result<impl Reply, Rejection> {
    let mut body = encode_registry(&REGISTRY);
    body.push_str(&get_metrics_body());
    Ok(body)
}

pub(crate) fn encode_registry(registry: &Registry) -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    };
    String::from_utf8(buffer).unwrap_or_else(|e| {
        error!("custom metrics could not be from_utf8'd: {}", e);
        String::default()
    })
}

/// Export autometrics-instrumented RPC metrics for Prometheus to scrape
pub fn get_metrics_body() -> String {
    prometheus_exporter::encode_http_response().into_body()
}
