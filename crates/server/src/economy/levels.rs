use common::model::User;

/// Ascending XP thresholds indexed by level: reaching `LEVEL_XP[n]` XP
/// qualifies for level `n + 1`. The table caps progression at level 8.
pub const LEVEL_XP: [u64; 8] = [0, 100, 250, 500, 1000, 2000, 5000, 10000];

pub const MAX_LEVEL: u32 = LEVEL_XP.len() as u32;

/// XP required to advance past `level`, or `None` at the cap.
pub fn next_threshold(level: u32) -> Option<u64> {
    LEVEL_XP.get(level as usize).copied()
}

/// The level-up cascade: as long as the XP meets the next threshold,
/// increment the level and credit a coin bonus equal to the new level
/// number. Returns the number of levels gained.
pub fn apply_level_cascade(user: &mut User) -> u32 {
    let mut gained = 0;
    while let Some(threshold) = next_threshold(user.level) {
        if user.xp < threshold {
            break;
        }
        user.level += 1;
        user.balance += u64::from(user.level);
        gained += 1;
    }
    gained
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn user_with(xp: u64, level: u32, balance: u64) -> User {
        let join = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut user = User::new("u1", "User_u1", join, balance);
        user.xp = xp;
        user.level = level;
        user
    }

    #[test]
    fn test_no_level_up_below_threshold() {
        let mut user = user_with(99, 1, 0);
        assert_eq!(apply_level_cascade(&mut user), 0);
        assert_eq!(user.level, 1);
        assert_eq!(user.balance, 0);
    }

    #[test]
    fn test_single_level_up_credits_new_level_number() {
        let mut user = user_with(100, 1, 0);
        assert_eq!(apply_level_cascade(&mut user), 1);
        assert_eq!(user.level, 2);
        assert_eq!(user.balance, 2);
    }

    #[test]
    fn test_cascade_spans_multiple_levels() {
        // 500 XP qualifies for levels 2, 3 and 4 in one mutation;
        // bonuses 2 + 3 + 4 = 9 coins.
        let mut user = user_with(500, 1, 0);
        assert_eq!(apply_level_cascade(&mut user), 3);
        assert_eq!(user.level, 4);
        assert_eq!(user.balance, 9);
    }

    #[test]
    fn test_cascade_stops_at_max_level() {
        let mut user = user_with(1_000_000, 1, 0);
        apply_level_cascade(&mut user);
        assert_eq!(user.level, MAX_LEVEL);
        assert_eq!(apply_level_cascade(&mut user), 0);
        assert_eq!(user.level, MAX_LEVEL);
    }

    #[test]
    fn test_level_n_requires_threshold_n_minus_one() {
        // Level 3 requires XP >= LEVEL_XP[2] = 250.
        let mut user = user_with(249, 1, 0);
        apply_level_cascade(&mut user);
        assert_eq!(user.level, 2);

        let mut user = user_with(250, 1, 0);
        apply_level_cascade(&mut user);
        assert_eq!(user.level, 3);
    }

    #[test]
    fn test_cascade_is_idempotent_once_settled() {
        let mut user = user_with(300, 1, 0);
        apply_level_cascade(&mut user);
        let (level, balance) = (user.level, user.balance);
        assert_eq!(apply_level_cascade(&mut user), 0);
        assert_eq!(user.level, level);
        assert_eq!(user.balance, balance);
    }
}
