//! Profile lookup with lazy creation, plus the profile mutations that can
//! trigger one-time task rewards.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::model::{TaskId, User};
use serde::{Deserialize, Serialize};

use super::{require, ApiError, AppState};
use crate::economy::tasks;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user_id: String,
    pub pseudo: String,
    pub join_date: String,
    pub xp: u64,
    pub level: u32,
    pub balance: u64,
    pub email: Option<String>,
    pub last_daily_claim: Option<String>,
    pub last_ad_claim: Option<String>,
    pub unlocked_pronos: Vec<String>,
    pub bet_count: u32,
    pub claimed_tasks: Vec<&'static str>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl From<&User> for ProfileResponse {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id.clone(),
            pseudo: user.pseudo.clone(),
            join_date: user.join_date.to_string(),
            xp: user.xp,
            level: user.level,
            balance: user.balance,
            email: user.email.clone(),
            last_daily_claim: user.last_daily_claim.map(|d| d.to_string()),
            last_ad_claim: user.last_ad_claim.map(|t| t.to_rfc3339()),
            unlocked_pronos: user.unlocked.iter().cloned().collect(),
            bet_count: user.bet_count,
            claimed_tasks: user.claimed_tasks.iter().map(TaskId::as_str).collect(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            username: user.username.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    user_id: Option<String>,
    tg_first_name: Option<String>,
    tg_last_name: Option<String>,
    tg_username: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&String> {
    value.as_ref().filter(|v| !v.is_empty())
}

/// GET /api/user_profile: return the record, creating it on first sight
/// (201 on creation). Social display fields sent by the client are kept in
/// sync on every lookup.
pub async fn user_profile(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProfileQuery>,
) -> Result<Response, ApiError> {
    let user_id = require(query.user_id.clone(), "user_id")?;

    if let Some(user) = state.engine.get(&user_id)? {
        let stale = [
            (non_empty(&query.tg_first_name), &user.first_name),
            (non_empty(&query.tg_last_name), &user.last_name),
            (non_empty(&query.tg_username), &user.username),
        ]
        .iter()
        .any(|(sent, stored)| sent.is_some_and(|v| stored.as_ref() != Some(v)));

        if !stale {
            return Ok(Json(ProfileResponse::from(&user)).into_response());
        }
        let updated = state.engine.apply(&user_id, |u| {
            if let Some(v) = non_empty(&query.tg_first_name) {
                u.first_name = Some(v.clone());
            }
            if let Some(v) = non_empty(&query.tg_last_name) {
                u.last_name = Some(v.clone());
            }
            if let Some(v) = non_empty(&query.tg_username) {
                u.username = Some(v.clone());
            }
            Ok(())
        })?;
        return Ok(Json(ProfileResponse::from(&updated)).into_response());
    }

    let default_pseudo = User::default_pseudo(&user_id);
    let pseudo = non_empty(&query.tg_username)
        .or(non_empty(&query.tg_first_name))
        .cloned()
        .unwrap_or_else(|| default_pseudo.clone());

    let today = chrono::Local::now().date_naive();
    let mut user = User::new(&user_id, &pseudo, today, state.economy.initial_balance);
    user.first_name = non_empty(&query.tg_first_name).cloned();
    user.last_name = non_empty(&query.tg_last_name).cloned();
    user.username = non_empty(&query.tg_username).cloned();
    if pseudo != default_pseudo {
        // A display name inherited from the social profile counts as done,
        // but pays no reward.
        user.claimed_tasks.insert(TaskId::Pseudo);
    }

    let created = state.engine.create(user)?;
    Ok((StatusCode::CREATED, Json(ProfileResponse::from(&created))).into_response())
}

#[derive(Debug, Deserialize)]
pub struct UpdatePseudoBody {
    user_id: Option<String>,
    pseudo: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdatePseudoResponse {
    message: String,
    new_pseudo: String,
    new_balance: u64,
    new_xp: u64,
    new_level: u32,
}

/// POST /api/update_pseudo: rename, claiming the pseudo task reward the
/// first time a custom name is set.
pub async fn update_pseudo(
    State(state): State<Arc<AppState>>,
    Json(body): Json<UpdatePseudoBody>,
) -> Result<Json<UpdatePseudoResponse>, ApiError> {
    let user_id = require(body.user_id, "user_id")?;
    let pseudo = require(body.pseudo, "pseudo")?.trim().to_string();
    let len = pseudo.chars().count();
    if !(3..=20).contains(&len) {
        return Err(ApiError::Validation(
            "pseudo must be between 3 and 20 characters".to_string(),
        ));
    }

    let mut rewarded = None;
    let updated = state.engine.apply(&user_id, |u| {
        u.pseudo = pseudo.clone();
        // Already claimed or still a generated name: not an error here.
        if let Ok(def) = tasks::claim(u, TaskId::Pseudo) {
            rewarded = Some(def);
        }
        Ok(())
    })?;

    let message = match rewarded {
        Some(def) => format!(
            "pseudo updated, reward claimed: +{} coins, +{} XP",
            def.coin_reward, def.xp_reward
        ),
        None => "pseudo updated".to_string(),
    };
    tracing::info!(user_id, pseudo = %updated.pseudo, "pseudo updated");

    Ok(Json(UpdatePseudoResponse {
        message,
        new_pseudo: updated.pseudo.clone(),
        new_balance: updated.balance,
        new_xp: updated.xp,
        new_level: updated.level,
    }))
}

#[derive(Debug, Deserialize)]
pub struct LinkGoogleBody {
    user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LinkGoogleResponse {
    message: String,
    email: String,
    new_balance: u64,
    new_xp: u64,
    new_level: u32,
}

/// POST /api/link_google_account: simulated OAuth link. The address is
/// derived from the pseudo; linking twice keeps the stored address.
pub async fn link_google_account(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LinkGoogleBody>,
) -> Result<Json<LinkGoogleResponse>, ApiError> {
    let user_id = require(body.user_id, "user_id")?;
    let user = state.engine.get(&user_id)?.ok_or(ApiError::NotFound)?;

    let local_part: String = user
        .pseudo
        .split('@')
        .next()
        .unwrap_or(&user.pseudo)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    let simulated = format!("{local_part}@pronobot.dev");

    let mut already_linked = None;
    let mut rewarded = None;
    let updated = state.engine.apply(&user_id, |u| {
        if let Some(email) = &u.email {
            already_linked = Some(email.clone());
            return Ok(());
        }
        u.email = Some(simulated.clone());
        if let Ok(def) = tasks::claim(u, TaskId::Google) {
            rewarded = Some(def);
        }
        Ok(())
    })?;

    let email = updated.email.clone().unwrap_or(simulated);
    let message = match (&already_linked, rewarded) {
        (Some(existing), _) => format!("account already linked to {existing}"),
        (None, Some(def)) => format!(
            "google account linked to {email}, reward claimed: +{} coins, +{} XP",
            def.coin_reward, def.xp_reward
        ),
        (None, None) => format!("google account linked to {email}"),
    };

    Ok(Json(LinkGoogleResponse {
        message,
        email,
        new_balance: updated.balance,
        new_xp: updated.xp,
        new_level: updated.level,
    }))
}
