//! The user-economy mutation core: currency spend/earn, XP accrual,
//! level-up cascades, one-time task rewards and cooldown-gated rewards.

pub mod engine;
pub mod levels;
pub mod ops;
pub mod stats;
pub mod tasks;

use thiserror::Error;

/// Domain-rule rejections. These leave the record store untouched and map
/// to HTTP 403 with the human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("prediction not unlocked")]
    NotUnlocked,
    #[error("match not found or not available")]
    MatchUnavailable,
    #[error("daily reward already claimed today")]
    DailyAlreadyClaimed,
    #[error("task reward already claimed")]
    AlreadyClaimed,
    #[error("task condition not met")]
    ConditionUnmet,
    #[error(
        "please wait another {} min {} sec before the next ad reward",
        .remaining_secs / 60,
        .remaining_secs % 60
    )]
    CooldownActive { remaining_secs: u64 },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("user not found")]
    NotFound,
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_message_reports_remaining_wait() {
        let err = DomainError::CooldownActive {
            remaining_secs: 125,
        };
        assert_eq!(
            err.to_string(),
            "please wait another 2 min 5 sec before the next ad reward"
        );
    }
}
