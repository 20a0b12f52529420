pub mod bets;
pub mod economy;
pub mod leaderboard;
pub mod matches;
pub mod profile;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use common::cache::TableCache;
use common::config::EconomyConfig;
use common::model::Prediction;
use common::store::CsvStore;
use serde::Serialize;
use thiserror::Error;

use crate::economy::engine::MutationEngine;
use crate::economy::{DomainError, EngineError};

/// Shared application state available to all handlers.
pub struct AppState {
    pub store: Arc<CsvStore>,
    pub engine: MutationEngine,
    pub economy: EconomyConfig,
    pub matches_cache: TableCache<Prediction>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(store: Arc<CsvStore>, economy: EconomyConfig, cache_ttl: Duration) -> Arc<Self> {
        Arc::new(Self {
            engine: MutationEngine::new(Arc::clone(&store)),
            store,
            economy,
            matches_cache: TableCache::new(cache_ttl),
            started_at: chrono::Utc::now(),
        })
    }

    /// The predictions table, served through the TTL cache. The server
    /// itself never writes this table (curation is external), so the only
    /// invalidation here is expiry.
    pub fn matches(&self) -> Result<Arc<Vec<Prediction>>> {
        self.matches_cache.get_or_load(|| self.store.load_all())
    }
}

/// Request failure taxonomy: validation 400, domain rejection 403 with the
/// human-readable reason, unknown user 404, anything unexpected 500 with a
/// generic message (full chain logged).
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("user not found")]
    NotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotFound => Self::NotFound,
            EngineError::Domain(domain) => Self::Domain(domain),
            EngineError::Storage(storage) => Self::Internal(storage),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Domain(err) => (StatusCode::FORBIDDEN, err.to_string()),
            Self::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            Self::Internal(err) => {
                tracing::error!(error = format!("{err:#}"), "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Reject missing or empty required fields with a 400.
fn require(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Validation(format!("{field} is required")))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/user_profile", get(profile::user_profile))
        .route("/api/update_pseudo", post(profile::update_pseudo))
        .route(
            "/api/link_google_account",
            post(profile::link_google_account),
        )
        .route("/api/matchs_csv", get(matches::matchs_csv))
        .route("/api/toggle_suivi_prono", post(matches::toggle_suivi_prono))
        .route("/api/pronos_suivis", get(matches::pronos_suivis))
        .route("/api/parier", post(economy::parier))
        .route("/api/unlock_prono", post(economy::unlock_prono))
        .route("/api/claim_daily_reward", post(economy::claim_daily_reward))
        .route("/api/claim_ad_reward", post(economy::claim_ad_reward))
        .route("/api/claim_task_reward", post(economy::claim_task_reward))
        .route("/api/tasks_status", get(economy::tasks_status))
        .route("/api/paris_en_cours", get(bets::paris_en_cours))
        .route("/api/historique_paris", get(bets::historique_paris))
        .route("/api/bilan", get(bets::bilan))
        .route("/api/bilan_chart_data", get(bets::bilan_chart_data))
        .route("/api/leaderboard", get(leaderboard::leaderboard))
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_secs: i64,
}

async fn health(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> impl IntoResponse {
    let uptime = chrono::Utc::now()
        .signed_duration_since(state.started_at)
        .num_seconds();

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: uptime,
    })
}
