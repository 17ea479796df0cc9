use anyhow::Result;
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use keybench_core::MetricsRegistry;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Serves the throughput counters for scraping.
pub struct MetricsServer {
    metrics: MetricsRegistry,
}

impl MetricsServer {
    pub fn new(metrics: MetricsRegistry) -> Self { Self { metrics } }

    /// Serves on `listener` until `cancel` fires.
    pub async fn serve(&self, listener: TcpListener, cancel: CancellationToken) -> Result<()> {
        info!("listening on {}", listener.local_addr()?);
        axum::serve(listener, router(self.metrics.clone())).with_graceful_shutdown(async move { cancel.cancelled().await }).await?;
        Ok(())
    }
}

pub fn router(metrics: MetricsRegistry) -> Router {
    Router::new().route("/", get(index)).route("/metrics", get(render_metrics)).with_state(metrics).layer(
        ServiceBuilder::new()
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                    .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                    .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
            )
            .into_inner(),
    )
}

async fn index() -> &'static str { "keybench is running; counters are at /metrics\n" }

async fn render_metrics(State(metrics): State<MetricsRegistry>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], metrics.render())
}
