//! The one-time task reward table.
//!
//! One declarative entry per task; completion checks dispatch through a
//! single predicate type instead of per-task ad-hoc code.

use common::model::{TaskId, User};

use super::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    /// Claimable as soon as it is unclaimed (self-reported tasks such as
    /// social follows and the tutorial).
    Always,
    MinBets(u32),
    EmailLinked,
    CustomPseudo,
}

impl Predicate {
    pub fn is_met(&self, user: &User) -> bool {
        match self {
            Self::Always => true,
            Self::MinBets(n) => user.bet_count >= *n,
            Self::EmailLinked => user.email.is_some(),
            Self::CustomPseudo => user.has_custom_pseudo(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskDef {
    pub id: TaskId,
    pub name: &'static str,
    pub coin_reward: u64,
    pub xp_reward: u64,
    pub predicate: Predicate,
}

const SOCIAL_COINS: u64 = 3;
const SOCIAL_XP: u64 = 5;

pub const TASKS: [TaskDef; 9] = [
    TaskDef {
        id: TaskId::Tutorial,
        name: "Finish the tutorial",
        coin_reward: 1,
        xp_reward: 5,
        predicate: Predicate::Always,
    },
    TaskDef {
        id: TaskId::Google,
        name: "Link your Google account",
        coin_reward: 5,
        xp_reward: 10,
        predicate: Predicate::EmailLinked,
    },
    TaskDef {
        id: TaskId::Pseudo,
        name: "Pick your pseudo",
        coin_reward: 2,
        xp_reward: 5,
        predicate: Predicate::CustomPseudo,
    },
    TaskDef {
        id: TaskId::ThreeBets,
        name: "Place 3 bets",
        coin_reward: 10,
        xp_reward: 15,
        predicate: Predicate::MinBets(3),
    },
    TaskDef {
        id: TaskId::Tiktok,
        name: "Follow on TikTok",
        coin_reward: SOCIAL_COINS,
        xp_reward: SOCIAL_XP,
        predicate: Predicate::Always,
    },
    TaskDef {
        id: TaskId::X,
        name: "Follow on X (Twitter)",
        coin_reward: SOCIAL_COINS,
        xp_reward: SOCIAL_XP,
        predicate: Predicate::Always,
    },
    TaskDef {
        id: TaskId::Instagram,
        name: "Follow on Instagram",
        coin_reward: SOCIAL_COINS,
        xp_reward: SOCIAL_XP,
        predicate: Predicate::Always,
    },
    TaskDef {
        id: TaskId::TgChannel,
        name: "Join the Telegram channel",
        coin_reward: SOCIAL_COINS,
        xp_reward: SOCIAL_XP,
        predicate: Predicate::Always,
    },
    TaskDef {
        id: TaskId::TgChat,
        name: "Join the Telegram chat",
        coin_reward: SOCIAL_COINS,
        xp_reward: SOCIAL_XP,
        predicate: Predicate::Always,
    },
];

pub fn task_def(id: TaskId) -> &'static TaskDef {
    TASKS
        .iter()
        .find(|t| t.id == id)
        .expect("every TaskId has a table entry")
}

/// Claim a one-time reward: rejects when already claimed or the predicate
/// is unmet, otherwise credits coins + XP and sets the claimed flag. The
/// level-up cascade is the mutation engine's job, not this function's.
pub fn claim(user: &mut User, id: TaskId) -> Result<&'static TaskDef, DomainError> {
    let def = task_def(id);
    if user.has_claimed(id) {
        return Err(DomainError::AlreadyClaimed);
    }
    if !def.predicate.is_met(user) {
        return Err(DomainError::ConditionUnmet);
    }
    user.balance += def.coin_reward;
    user.xp += def.xp_reward;
    user.claimed_tasks.insert(id);
    Ok(def)
}

/// (current, target) progress pair for tasks with a counted predicate.
pub fn progress(user: &User, id: TaskId) -> Option<(u32, u32)> {
    match task_def(id).predicate {
        Predicate::MinBets(target) => Some((user.bet_count, target)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fresh_user() -> User {
        let join = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        User::new("u1", "User_u1", join, 50)
    }

    #[test]
    fn test_every_task_id_has_a_definition() {
        for id in TaskId::ALL {
            let _ = task_def(id);
        }
    }

    #[test]
    fn test_claim_social_task_credits_rewards() {
        let mut user = fresh_user();
        let def = claim(&mut user, TaskId::Tiktok).unwrap();
        assert_eq!(def.coin_reward, 3);
        assert_eq!(user.balance, 53);
        assert_eq!(user.xp, 5);
        assert!(user.has_claimed(TaskId::Tiktok));
    }

    #[test]
    fn test_second_claim_always_rejects() {
        let mut user = fresh_user();
        claim(&mut user, TaskId::Tutorial).unwrap();
        let before = user.clone();
        assert_eq!(
            claim(&mut user, TaskId::Tutorial),
            Err(DomainError::AlreadyClaimed)
        );
        assert_eq!(user, before);
    }

    #[test]
    fn test_three_bets_requires_bet_count() {
        let mut user = fresh_user();
        assert_eq!(
            claim(&mut user, TaskId::ThreeBets),
            Err(DomainError::ConditionUnmet)
        );
        user.bet_count = 3;
        let def = claim(&mut user, TaskId::ThreeBets).unwrap();
        assert_eq!(def.coin_reward, 10);
        assert_eq!(def.xp_reward, 15);
    }

    #[test]
    fn test_google_requires_linked_email() {
        let mut user = fresh_user();
        assert_eq!(
            claim(&mut user, TaskId::Google),
            Err(DomainError::ConditionUnmet)
        );
        user.email = Some("u1@pronobot.dev".to_string());
        assert!(claim(&mut user, TaskId::Google).is_ok());
    }

    #[test]
    fn test_pseudo_requires_custom_name() {
        let mut user = fresh_user();
        assert_eq!(
            claim(&mut user, TaskId::Pseudo),
            Err(DomainError::ConditionUnmet)
        );
        user.pseudo = "Tipster".to_string();
        assert!(claim(&mut user, TaskId::Pseudo).is_ok());
    }

    #[test]
    fn test_progress_only_for_counted_tasks() {
        let mut user = fresh_user();
        user.bet_count = 2;
        assert_eq!(progress(&user, TaskId::ThreeBets), Some((2, 3)));
        assert_eq!(progress(&user, TaskId::Tiktok), None);
    }
}
