//! Economy state transitions.
//!
//! Each function mutates a [`User`] in place and signals a domain
//! rejection without side effects on failure. Callers run them inside
//! [`super::engine::MutationEngine::apply`], which handles loading,
//! the level-up cascade and persistence. Clocks are parameters so the
//! cooldown and calendar rules stay testable.

use chrono::{DateTime, NaiveDate, Utc};
use common::config::EconomyConfig;
use common::model::User;

use super::DomainError;

/// Unlock a prediction: one-time fixed cost. Unlocking something already
/// unlocked is a successful no-op, never a second charge.
pub fn unlock(user: &mut User, economy: &EconomyConfig, match_id: &str) -> Result<(), DomainError> {
    if user.unlocked.contains(match_id) {
        return Ok(());
    }
    user.balance = user
        .balance
        .checked_sub(economy.unlock_cost)
        .ok_or(DomainError::InsufficientBalance)?;
    user.xp += economy.xp_per_unlock;
    user.unlocked.insert(match_id.to_string());
    Ok(())
}

/// Debit the fixed stake for a bet on an unlocked prediction. The caller
/// has already verified the prediction exists and is still upcoming.
pub fn place_bet(
    user: &mut User,
    economy: &EconomyConfig,
    match_id: &str,
) -> Result<(), DomainError> {
    if !user.unlocked.contains(match_id) {
        return Err(DomainError::NotUnlocked);
    }
    user.balance = user
        .balance
        .checked_sub(economy.bet_stake)
        .ok_or(DomainError::InsufficientBalance)?;
    user.xp += economy.xp_per_bet;
    user.bet_count += 1;
    Ok(())
}

/// Daily reward: at most once per calendar date, compared by date rather
/// than elapsed seconds.
pub fn claim_daily(
    user: &mut User,
    economy: &EconomyConfig,
    today: NaiveDate,
) -> Result<(), DomainError> {
    if user.last_daily_claim == Some(today) {
        return Err(DomainError::DailyAlreadyClaimed);
    }
    user.balance += economy.daily_reward_coins;
    user.xp += economy.daily_reward_xp;
    user.last_daily_claim = Some(today);
    Ok(())
}

/// Ad-watch reward: gated by a fixed cooldown window; the rejection carries
/// the remaining wait so the client can display it.
pub fn claim_ad(
    user: &mut User,
    economy: &EconomyConfig,
    now: DateTime<Utc>,
) -> Result<(), DomainError> {
    if let Some(last) = user.last_ad_claim {
        let elapsed = now.signed_duration_since(last).num_seconds().max(0) as u64;
        if elapsed < economy.ad_cooldown_secs {
            return Err(DomainError::CooldownActive {
                remaining_secs: economy.ad_cooldown_secs - elapsed,
            });
        }
    }
    user.balance += economy.ad_reward_coins;
    user.xp += economy.ad_reward_xp;
    user.last_ad_claim = Some(now);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn economy() -> EconomyConfig {
        EconomyConfig::default()
    }

    fn fresh_user(balance: u64) -> User {
        let join = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        User::new("u1", "User_u1", join, balance)
    }

    #[test]
    fn test_unlock_debits_once_then_noops() {
        let mut user = fresh_user(50);
        unlock(&mut user, &economy(), "m1").unwrap();
        assert_eq!(user.balance, 40);
        assert_eq!(user.xp, 2);
        assert!(user.unlocked.contains("m1"));

        // Second unlock of the same id: no charge, no extra XP.
        unlock(&mut user, &economy(), "m1").unwrap();
        assert_eq!(user.balance, 40);
        assert_eq!(user.xp, 2);
    }

    #[test]
    fn test_unlock_rejects_when_unpayable() {
        let mut user = fresh_user(9);
        let before = user.clone();
        assert_eq!(
            unlock(&mut user, &economy(), "m1"),
            Err(DomainError::InsufficientBalance)
        );
        assert_eq!(user, before);
    }

    #[test]
    fn test_bet_requires_unlock_first() {
        let mut user = fresh_user(50);
        assert_eq!(
            place_bet(&mut user, &economy(), "m1"),
            Err(DomainError::NotUnlocked)
        );
        assert_eq!(user.balance, 50);
    }

    #[test]
    fn test_worked_example_unlock_then_bet() {
        // 50 coins -> unlock (10) -> 40 -> bet (10) -> 30.
        let mut user = fresh_user(50);
        unlock(&mut user, &economy(), "m1").unwrap();
        assert_eq!(user.balance, 40);
        place_bet(&mut user, &economy(), "m1").unwrap();
        assert_eq!(user.balance, 30);
        assert_eq!(user.bet_count, 1);
        assert_eq!(user.xp, 3); // 2 for the unlock, 1 for the bet
    }

    #[test]
    fn test_bet_rejects_without_funds() {
        let mut user = fresh_user(15);
        unlock(&mut user, &economy(), "m1").unwrap();
        assert_eq!(user.balance, 5);
        assert_eq!(
            place_bet(&mut user, &economy(), "m1"),
            Err(DomainError::InsufficientBalance)
        );
        assert_eq!(user.balance, 5);
        assert_eq!(user.bet_count, 0);
    }

    #[test]
    fn test_daily_once_per_calendar_date() {
        let mut user = fresh_user(0);
        let day1 = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();

        claim_daily(&mut user, &economy(), day1).unwrap();
        assert_eq!(user.balance, 5);
        assert_eq!(user.xp, 5);

        assert_eq!(
            claim_daily(&mut user, &economy(), day1),
            Err(DomainError::DailyAlreadyClaimed)
        );

        claim_daily(&mut user, &economy(), day2).unwrap();
        assert_eq!(user.balance, 10);
    }

    #[test]
    fn test_ad_reward_cooldown_window() {
        let mut user = fresh_user(0);
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        claim_ad(&mut user, &economy(), t0).unwrap();
        assert_eq!(user.balance, 1);
        assert_eq!(user.xp, 1);

        // 10 minutes later: 50 minutes remaining.
        let t1 = t0 + chrono::Duration::minutes(10);
        let err = claim_ad(&mut user, &economy(), t1).unwrap_err();
        assert_eq!(
            err,
            DomainError::CooldownActive {
                remaining_secs: 3000
            }
        );
        assert_eq!(
            err.to_string(),
            "please wait another 50 min 0 sec before the next ad reward"
        );

        // After the full window the claim succeeds again.
        let t2 = t0 + chrono::Duration::seconds(3600);
        claim_ad(&mut user, &economy(), t2).unwrap();
        assert_eq!(user.balance, 2);
        assert_eq!(user.last_ad_claim, Some(t2));
    }

    #[test]
    fn test_first_ad_claim_has_no_cooldown() {
        let mut user = fresh_user(0);
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert!(claim_ad(&mut user, &economy(), now).is_ok());
    }
}
