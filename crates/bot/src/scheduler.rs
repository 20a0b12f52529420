//! Daily slot timing: compute the next wall-clock occurrence of a posting
//! time and sleep until it.

use chrono::{DateTime, NaiveTime, TimeZone};

/// The next occurrence of `at` strictly after `now`: today when still
/// ahead, otherwise tomorrow. Days where the local time does not exist
/// (DST gaps) are skipped.
pub fn next_occurrence<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> Option<DateTime<Tz>> {
    let mut date = now.date_naive();
    if now.time() >= at {
        date = date.succ_opt()?;
    }
    for _ in 0..3 {
        if let Some(next) = now.timezone().from_local_datetime(&date.and_time(at)).earliest() {
            if next > *now {
                return Some(next);
            }
        }
        date = date.succ_opt()?;
    }
    None
}

/// Sleep until the next occurrence of `at`, returning the day the slot
/// fires on.
pub async fn sleep_until(at: NaiveTime) -> Option<chrono::NaiveDate> {
    let now = chrono::Local::now();
    let next = next_occurrence(&now, at)?;
    let wait = (next - now).to_std().unwrap_or_default();
    tracing::debug!(at = %next.naive_local(), "sleeping until next slot");
    tokio::time::sleep(wait).await;
    Some(next.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_next_occurrence_later_today() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 8, 0, 0).unwrap();
        let next = next_occurrence(&now, time(9, 0)).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_next_occurrence_rolls_to_tomorrow() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 12, 30, 0).unwrap();
        let next = next_occurrence(&now, time(9, 0)).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 6, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_exact_slot_time_schedules_tomorrow() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap();
        let next = next_occurrence(&now, time(9, 0)).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 6, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_month_boundary() {
        let now = Utc.with_ymd_and_hms(2024, 2, 29, 21, 0, 0).unwrap();
        let next = next_occurrence(&now, time(20, 0)).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap());
    }
}
