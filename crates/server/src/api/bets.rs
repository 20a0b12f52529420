//! Read-side endpoints over the bets table: open bets, history and the
//! aggregated bilan.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use common::model::Bet;
use serde::{Deserialize, Serialize};

use super::matches::parse_date_filter;
use super::{require, ApiError, AppState};
use crate::economy::stats;

#[derive(Debug, Serialize)]
pub struct BetDto {
    pub bet_id: String,
    pub match_id: String,
    pub match_name: String,
    pub placed_at: String,
    pub stake: u64,
    pub status: &'static str,
    pub odds: f64,
    pub pick: String,
    pub payout: i64,
}

impl From<&Bet> for BetDto {
    fn from(bet: &Bet) -> Self {
        Self {
            bet_id: bet.bet_id.clone(),
            match_id: bet.match_id.clone(),
            match_name: bet.match_name.clone(),
            placed_at: bet.placed_at.to_rfc3339(),
            stake: bet.stake,
            status: bet.status.as_str(),
            odds: bet.odds,
            pick: bet.pick.clone(),
            payout: bet.payout,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BetsQuery {
    user_id: Option<String>,
    date: Option<String>,
}

fn user_bets(state: &AppState, user_id: &str) -> Result<Vec<Bet>, ApiError> {
    let bets: Vec<Bet> = state.store.load_all()?;
    Ok(bets.into_iter().filter(|b| b.user_id == user_id).collect())
}

/// GET /api/paris_en_cours: the user's open bets, most recent first.
pub async fn paris_en_cours(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BetsQuery>,
) -> Result<Json<Vec<BetDto>>, ApiError> {
    let user_id = require(query.user_id, "user_id")?;

    let mut bets: Vec<Bet> = user_bets(&state, &user_id)?
        .into_iter()
        .filter(|b| !b.status.is_settled())
        .collect();
    bets.sort_by(|a, b| b.placed_at.cmp(&a.placed_at));

    Ok(Json(bets.iter().map(BetDto::from).collect()))
}

/// GET /api/historique_paris: every bet the user ever placed, optionally
/// restricted to one placement date, most recent first.
pub async fn historique_paris(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BetsQuery>,
) -> Result<Json<Vec<BetDto>>, ApiError> {
    let user_id = require(query.user_id, "user_id")?;
    let filter = parse_date_filter(query.date)?;

    let mut bets: Vec<Bet> = user_bets(&state, &user_id)?
        .into_iter()
        .filter(|b| filter.is_none_or(|d| b.placed_at.date_naive() == d))
        .collect();
    bets.sort_by(|a, b| b.placed_at.cmp(&a.placed_at));

    Ok(Json(bets.iter().map(BetDto::from).collect()))
}

/// GET /api/bilan: settled-bet aggregates for the user.
pub async fn bilan(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BetsQuery>,
) -> Result<Json<stats::Bilan>, ApiError> {
    let user_id = require(query.user_id, "user_id")?;
    let bets = user_bets(&state, &user_id)?;
    Ok(Json(stats::bilan(&bets)))
}

/// GET /api/bilan_chart_data: per-day settled series with cumulative PnL.
pub async fn bilan_chart_data(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BetsQuery>,
) -> Result<Json<stats::ChartData>, ApiError> {
    let user_id = require(query.user_id, "user_id")?;
    let bets = user_bets(&state, &user_id)?;
    Ok(Json(stats::chart_data(&bets)))
}
