use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

/// One-time achievement identifiers. The claimed set on [`User`] records
/// which of these have already paid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskId {
    Tutorial,
    Google,
    Pseudo,
    ThreeBets,
    Tiktok,
    X,
    Instagram,
    TgChannel,
    TgChat,
}

impl TaskId {
    pub const ALL: [TaskId; 9] = [
        TaskId::Tutorial,
        TaskId::Google,
        TaskId::Pseudo,
        TaskId::ThreeBets,
        TaskId::Tiktok,
        TaskId::X,
        TaskId::Instagram,
        TaskId::TgChannel,
        TaskId::TgChat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tutorial => "tutorial",
            Self::Google => "google",
            Self::Pseudo => "pseudo",
            Self::ThreeBets => "three_bets",
            Self::Tiktok => "tiktok",
            Self::X => "x",
            Self::Instagram => "instagram",
            Self::TgChannel => "tg_channel",
            Self::TgChat => "tg_chat",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionStatus {
    Upcoming,
    SettledWon,
    SettledLost,
    Cancelled,
}

impl PredictionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::SettledWon => "settled_won",
            Self::SettledLost => "settled_lost",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "upcoming" => Some(Self::Upcoming),
            "settled_won" => Some(Self::SettledWon),
            "settled_lost" => Some(Self::SettledLost),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BetStatus {
    Open,
    Won,
    Lost,
}

impl BetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Won => "won",
            Self::Lost => "lost",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "won" => Some(Self::Won),
            "lost" => Some(Self::Lost),
            _ => None,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

/// A user's full gamification record.
///
/// Invariants maintained by the mutation engine: `balance` is never driven
/// negative (u64 plus checked arithmetic), `level` and `xp` only grow, and
/// `claimed_tasks` entries are never removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: String,
    pub pseudo: String,
    pub join_date: NaiveDate,
    pub xp: u64,
    pub level: u32,
    pub balance: u64,
    pub email: Option<String>,
    pub last_daily_claim: Option<NaiveDate>,
    pub last_ad_claim: Option<DateTime<Utc>>,
    pub unlocked: BTreeSet<String>,
    pub bet_count: u32,
    pub claimed_tasks: BTreeSet<TaskId>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl User {
    /// Starter record for lazy creation on first profile request.
    pub fn new(user_id: &str, pseudo: &str, join_date: NaiveDate, initial_balance: u64) -> Self {
        Self {
            user_id: user_id.to_string(),
            pseudo: pseudo.to_string(),
            join_date,
            xp: 0,
            level: 1,
            balance: initial_balance,
            email: None,
            last_daily_claim: None,
            last_ad_claim: None,
            unlocked: BTreeSet::new(),
            bet_count: 0,
            claimed_tasks: BTreeSet::new(),
            first_name: None,
            last_name: None,
            username: None,
        }
    }

    /// Auto-generated pseudo assigned when no display name is known.
    pub fn default_pseudo(user_id: &str) -> String {
        let prefix: String = user_id.chars().take(6).collect();
        format!("User_{prefix}")
    }

    /// True once the user picked a name of their own (the pseudo task
    /// predicate).
    pub fn has_custom_pseudo(&self) -> bool {
        !self.pseudo.is_empty() && !self.pseudo.starts_with("User_")
    }

    pub fn has_claimed(&self, task: TaskId) -> bool {
        self.claimed_tasks.contains(&task)
    }
}

/// A published prediction. Immutable once settled; settlement itself is an
/// external curation process.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub match_id: String,
    pub date: NaiveDate,
    pub time: String,
    pub name: String,
    pub pick: String,
    pub odds: f64,
    pub status: PredictionStatus,
}

impl Prediction {
    pub fn is_upcoming(&self) -> bool {
        self.status == PredictionStatus::Upcoming
    }
}

/// A placed bet. Created once by the server; transitioned to a terminal
/// status by the external settlement process.
#[derive(Debug, Clone, PartialEq)]
pub struct Bet {
    pub bet_id: String,
    pub user_id: String,
    pub match_id: String,
    pub match_name: String,
    pub placed_at: DateTime<Utc>,
    pub stake: u64,
    pub status: BetStatus,
    pub odds: f64,
    pub pick: String,
    /// Net gain credited on a win; 0 while open or lost.
    pub payout: i64,
}

/// Follow toggle membership record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Follow {
    pub user_id: String,
    pub match_id: String,
    pub followed_at: DateTime<Utc>,
}
