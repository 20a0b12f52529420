//! The published prediction feed and the follow toggle.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{NaiveDate, Utc};
use common::model::{Follow, Prediction};
use serde::{Deserialize, Serialize};

use super::{require, ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct PredictionDto {
    pub match_id: String,
    pub date: String,
    pub time: String,
    pub name: String,
    pub pick: String,
    pub odds: f64,
}

impl From<&Prediction> for PredictionDto {
    fn from(p: &Prediction) -> Self {
        Self {
            match_id: p.match_id.clone(),
            date: p.date.to_string(),
            time: p.time.clone(),
            name: p.name.clone(),
            pick: p.pick.clone(),
            odds: p.odds,
        }
    }
}

pub(super) fn parse_date_filter(raw: Option<String>) -> Result<Option<NaiveDate>, ApiError> {
    raw.filter(|v| !v.is_empty())
        .map(|v| {
            NaiveDate::parse_from_str(&v, "%Y-%m-%d")
                .map_err(|_| ApiError::Validation("invalid date format, use YYYY-MM-DD".to_string()))
        })
        .transpose()
}

#[derive(Debug, Deserialize)]
pub struct MatchesQuery {
    date: Option<String>,
}

/// GET /api/matchs_csv: upcoming predictions, optionally filtered to one
/// date, ordered by date then kickoff time.
pub async fn matchs_csv(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MatchesQuery>,
) -> Result<Json<Vec<PredictionDto>>, ApiError> {
    let filter = parse_date_filter(query.date)?;
    let matches = state.matches()?;

    let mut rows: Vec<&Prediction> = matches
        .iter()
        .filter(|p| p.is_upcoming() && filter.is_none_or(|d| p.date == d))
        .collect();
    rows.sort_by(|a, b| (a.date, &a.time).cmp(&(b.date, &b.time)));

    Ok(Json(rows.into_iter().map(PredictionDto::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct ToggleBody {
    user_id: Option<String>,
    match_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    message: String,
    pronos_suivis_ids: Vec<String>,
}

/// POST /api/toggle_suivi_prono: flip follow membership for one prediction
/// and return the user's full followed-id list.
pub async fn toggle_suivi_prono(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ToggleBody>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let user_id = require(body.user_id, "user_id")?;
    let match_id = require(body.match_id, "match_id")?;

    let mut follows: Vec<Follow> = state.store.load_all()?;
    let existed = follows
        .iter()
        .any(|f| f.user_id == user_id && f.match_id == match_id);
    if existed {
        follows.retain(|f| !(f.user_id == user_id && f.match_id == match_id));
    } else {
        follows.push(Follow {
            user_id: user_id.clone(),
            match_id,
            followed_at: Utc::now(),
        });
    }
    state.store.rewrite_all(&follows)?;

    let pronos_suivis_ids: Vec<String> = follows
        .iter()
        .filter(|f| f.user_id == user_id)
        .map(|f| f.match_id.clone())
        .collect();
    let message = if existed {
        "prediction removed from followed".to_string()
    } else {
        "prediction added to followed".to_string()
    };

    Ok(Json(ToggleResponse {
        message,
        pronos_suivis_ids,
    }))
}

#[derive(Debug, Deserialize)]
pub struct FollowedQuery {
    user_id: Option<String>,
}

/// GET /api/pronos_suivis: the still-upcoming predictions the user follows.
pub async fn pronos_suivis(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FollowedQuery>,
) -> Result<Json<Vec<PredictionDto>>, ApiError> {
    let user_id = require(query.user_id, "user_id")?;

    let follows: Vec<Follow> = state.store.load_all()?;
    let followed_ids: Vec<&str> = follows
        .iter()
        .filter(|f| f.user_id == user_id)
        .map(|f| f.match_id.as_str())
        .collect();

    let matches = state.matches()?;
    let mut rows: Vec<&Prediction> = matches
        .iter()
        .filter(|p| p.is_upcoming() && followed_ids.contains(&p.match_id.as_str()))
        .collect();
    rows.sort_by(|a, b| (a.date, &a.time).cmp(&(b.date, &b.time)));

    Ok(Json(rows.into_iter().map(PredictionDto::from).collect()))
}
