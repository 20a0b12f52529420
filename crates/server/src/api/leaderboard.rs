//! Top-20 ranking over the users table.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use common::model::User;
use serde::Serialize;

use super::{ApiError, AppState};
use crate::economy::stats;

const LEADERBOARD_SIZE: usize = 20;

#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub pseudo: String,
    pub level: u32,
    pub xp: u64,
    pub balance: u64,
}

/// GET /api/leaderboard: top users by balance, level breaking ties, XP
/// breaking those.
pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    let users: Vec<User> = state.store.load_all()?;
    let entries = stats::leaderboard(&users, LEADERBOARD_SIZE)
        .into_iter()
        .map(|u| LeaderboardEntry {
            user_id: u.user_id.clone(),
            pseudo: u.pseudo.clone(),
            level: u.level,
            xp: u.xp,
            balance: u.balance,
        })
        .collect();
    Ok(Json(entries))
}
