//! Room-Climate Feature Service
//!
//! REST API that fetches raw room-climate readings, turns them into feature
//! vectors and classifies each sensor's current state.

use axum::{routing::get, Router};
use feature_engine::FeatureExtractor;
use inference_engine::{load_classifier, StateClassifier};
use ingestion::{HttpMeasurementSource, MeasurementSource, SourceError};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub mod error;
pub mod routes;
pub mod settings;

pub use error::ApiError;
pub use settings::{LogFormat, Settings, SettingsError};

/// Application state shared across handlers
pub struct AppState {
    /// Where raw readings come from
    pub source: Arc<dyn MeasurementSource>,
    pub extractor: FeatureExtractor,
    pub classifier: Arc<dyn StateClassifier>,
    /// Trailing window used when a request omits `start`
    pub default_window_hours: u32,
    /// Installed Prometheus recorder, if any
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Build the production state: HTTP source, configured extractor and
    /// the classifier selected by `model_dir`
    pub fn from_settings(
        settings: &Settings,
        metrics: Option<PrometheusHandle>,
    ) -> Result<Self, SourceError> {
        let source = HttpMeasurementSource::new(settings.source_config())?;
        Ok(Self {
            source: Arc::new(source),
            extractor: FeatureExtractor::new(settings.extractor_config()),
            classifier: load_classifier(settings.model_dir.as_deref()),
            default_window_hours: settings.default_time_window_hours,
            metrics,
        })
    }
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_handler))
        .route("/metrics", get(routes::health::metrics_handler))
        .route(
            "/api/feature-vectors",
            get(routes::features::get_feature_vectors),
        )
        .route("/api/predictions", get(routes::predictions::get_predictions))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Initialize logging; `RUST_LOG` overrides the default `info` filter
pub fn init_logging(format: LogFormat) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
}

/// Serve `state` on `listener` until ctrl-c
pub async fn serve(listener: tokio::net::TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    info!("Starting API server on {}", listener.local_addr()?);
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
}
