use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;
use tracing::error;

use crate::shared::{AppError, AppState};

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct GateRejectionLabels {
    pub reason: GateRejectionReason,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum GateRejectionReason {
    NoCredentials,
    InvalidCredentials,
}

/// Counters for the session lifecycle.
///
/// Counters work unregistered, so a service built without a registry
/// (tests, tooling) still counts; `register` exposes them for scraping.
#[derive(Default)]
pub struct SessionMetrics {
    pub logins: Counter,
    pub login_rejections: Counter,
    pub rotations: Counter,
    pub logouts: Counter,
    pub gate_rejections: Family<GateRejectionLabels, Counter>,
}

impl SessionMetrics {
    pub fn register(&self, registry: &mut Registry) {
        registry.register(
            "wordserweb_logins",
            "Successful logins",
            self.logins.clone(),
        );
        registry.register(
            "wordserweb_login_rejections",
            "Logins refused for bad credentials",
            self.login_rejections.clone(),
        );
        registry.register(
            "wordserweb_session_rotations",
            "Sessions replaced by the sliding refresh",
            self.rotations.clone(),
        );
        registry.register(
            "wordserweb_logouts",
            "Sessions revoked by logout",
            self.logouts.clone(),
        );
        registry.register(
            "wordserweb_gate_rejections",
            "Requests refused by the session gate",
            self.gate_rejections.clone(),
        );
    }

    pub fn record_gate_rejection(&self, reason: GateRejectionReason) {
        self.gate_rejections
            .get_or_create(&GateRejectionLabels { reason })
            .inc();
    }
}

/// Registry served at `/metrics`
pub struct MetricsRegistry {
    pub registry: Arc<Registry>,
    pub metrics: Arc<SessionMetrics>,
}

impl MetricsRegistry {
    pub fn new(metrics: Arc<SessionMetrics>) -> Self {
        let mut registry = Registry::default();
        metrics.register(&mut registry);
        Self {
            registry: Arc::new(registry),
            metrics,
        }
    }

    /// OpenMetrics text exposition of every registered metric
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buf = String::new();
        prometheus_client::encoding::text::encode(&mut buf, &self.registry)?;
        Ok(buf)
    }
}

/// GET /metrics
pub async fn metrics(State(state): State<AppState>) -> Result<Response, AppError> {
    let body = state.metrics.encode().map_err(|e| {
        error!(error = %e, "Metrics encoding failed");
        AppError::Internal
    })?;

    Ok((
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "application/openmetrics-text; version=1.0.0; charset=utf-8",
        )],
        body,
    )
        .into_response())
}
