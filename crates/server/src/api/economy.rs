//! Handlers for the spend/earn operations: betting, unlocks, recurring
//! rewards and one-time task rewards.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use common::model::{Bet, BetStatus, TaskId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{require, ApiError, AppState};
use crate::economy::{ops, tasks, DomainError};

#[derive(Debug, Deserialize)]
pub struct MatchActionBody {
    user_id: Option<String>,
    match_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserBody {
    user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MutationResponse {
    message: String,
    new_balance: u64,
    new_xp: u64,
    new_level: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    bet_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unlocked_pronos: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_daily_claim: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    claimed_task_id: Option<&'static str>,
}

impl MutationResponse {
    fn new(message: String, user: &common::model::User) -> Self {
        Self {
            message,
            new_balance: user.balance,
            new_xp: user.xp,
            new_level: user.level,
            bet_count: None,
            unlocked_pronos: None,
            last_daily_claim: None,
            claimed_task_id: None,
        }
    }
}

/// POST /api/parier: stake on an unlocked, still-upcoming prediction. The
/// open bet record is written in the same per-user critical section as the
/// debit, so a failed write leaves the user uncharged.
pub async fn parier(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MatchActionBody>,
) -> Result<Json<MutationResponse>, ApiError> {
    let user_id = require(body.user_id, "user_id")?;
    let match_id = require(body.match_id, "match_id")?;

    let matches = state.matches()?;
    let prediction = matches
        .iter()
        .find(|p| p.match_id == match_id && p.is_upcoming())
        .cloned()
        .ok_or(ApiError::Domain(DomainError::MatchUnavailable))?;

    let economy = state.economy.clone();
    let bet_id = Uuid::new_v4().to_string();
    let placed_at = Utc::now();
    let updated = state.engine.apply_with_record(
        &user_id,
        |u| ops::place_bet(u, &economy, &match_id),
        |_| Bet {
            bet_id: bet_id.clone(),
            user_id: user_id.clone(),
            match_id: match_id.clone(),
            match_name: prediction.name,
            placed_at,
            stake: economy.bet_stake,
            status: BetStatus::Open,
            odds: prediction.odds,
            pick: prediction.pick,
            payout: 0,
        },
    )?;
    tracing::info!(user_id, bet_id, match_id, "bet placed");

    let mut response = MutationResponse::new("bet placed".to_string(), &updated);
    response.bet_count = Some(updated.bet_count);
    Ok(Json(response))
}

/// POST /api/unlock_prono: pay the one-time unlock cost for a prediction.
pub async fn unlock_prono(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MatchActionBody>,
) -> Result<Json<MutationResponse>, ApiError> {
    let user_id = require(body.user_id, "user_id")?;
    let match_id = require(body.match_id, "match_id")?;

    let economy = state.economy.clone();
    let updated = state
        .engine
        .apply(&user_id, |u| ops::unlock(u, &economy, &match_id))?;

    let mut response = MutationResponse::new("prediction unlocked".to_string(), &updated);
    response.unlocked_pronos = Some(updated.unlocked.iter().cloned().collect());
    Ok(Json(response))
}

/// POST /api/claim_daily_reward: once per calendar day (server-local date).
pub async fn claim_daily_reward(
    State(state): State<Arc<AppState>>,
    Json(body): Json<UserBody>,
) -> Result<Json<MutationResponse>, ApiError> {
    let user_id = require(body.user_id, "user_id")?;

    let economy = state.economy.clone();
    let today = chrono::Local::now().date_naive();
    let updated = state
        .engine
        .apply(&user_id, |u| ops::claim_daily(u, &economy, today))?;

    let message = format!(
        "daily reward claimed: +{} coins, +{} XP",
        economy.daily_reward_coins, economy.daily_reward_xp
    );
    let mut response = MutationResponse::new(message, &updated);
    response.last_daily_claim = Some(today.to_string());
    Ok(Json(response))
}

/// POST /api/claim_ad_reward: cooldown-gated ad reward.
pub async fn claim_ad_reward(
    State(state): State<Arc<AppState>>,
    Json(body): Json<UserBody>,
) -> Result<Json<MutationResponse>, ApiError> {
    let user_id = require(body.user_id, "user_id")?;

    let economy = state.economy.clone();
    let now = Utc::now();
    let updated = state
        .engine
        .apply(&user_id, |u| ops::claim_ad(u, &economy, now))?;

    let message = format!(
        "ad reward claimed: +{} coin, +{} XP",
        economy.ad_reward_coins, economy.ad_reward_xp
    );
    Ok(Json(MutationResponse::new(message, &updated)))
}

#[derive(Debug, Deserialize)]
pub struct ClaimTaskBody {
    user_id: Option<String>,
    task_id: Option<String>,
}

/// POST /api/claim_task_reward: claim a one-time achievement reward.
pub async fn claim_task_reward(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ClaimTaskBody>,
) -> Result<Json<MutationResponse>, ApiError> {
    let user_id = require(body.user_id, "user_id")?;
    let raw_task = require(body.task_id, "task_id")?;
    let task = TaskId::parse(&raw_task)
        .ok_or_else(|| ApiError::Validation(format!("unknown task id '{raw_task}'")))?;

    let updated = state
        .engine
        .apply(&user_id, |u| tasks::claim(u, task).map(|_| ()))?;

    let def = tasks::task_def(task);
    let message = format!(
        "reward for '{}' claimed: +{} coins, +{} XP",
        def.name, def.coin_reward, def.xp_reward
    );
    tracing::info!(user_id, task = task.as_str(), "task reward claimed");

    let mut response = MutationResponse::new(message, &updated);
    response.claimed_task_id = Some(task.as_str());
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct TasksStatusQuery {
    user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TaskStatus {
    id: &'static str,
    name: &'static str,
    coin_reward: u64,
    xp_reward: u64,
    is_claimed: bool,
    is_claimable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_progress: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_progress: Option<u32>,
}

/// GET /api/tasks_status: the full task table with per-user claim state and
/// progress counters.
pub async fn tasks_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TasksStatusQuery>,
) -> Result<Json<Vec<TaskStatus>>, ApiError> {
    let user_id = require(query.user_id, "user_id")?;
    let user = state.engine.get(&user_id)?.ok_or(ApiError::NotFound)?;

    let statuses = tasks::TASKS
        .iter()
        .map(|def| {
            let is_claimed = user.has_claimed(def.id);
            let progress = tasks::progress(&user, def.id);
            TaskStatus {
                id: def.id.as_str(),
                name: def.name,
                coin_reward: def.coin_reward,
                xp_reward: def.xp_reward,
                is_claimed,
                is_claimable: !is_claimed && def.predicate.is_met(&user),
                current_progress: progress.map(|(current, _)| current),
                target_progress: progress.map(|(_, target)| target),
            }
        })
        .collect();

    Ok(Json(statuses))
}
