//! The post feed: a published CSV with one row per posting slot and day.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

/// One feed row. `Date` is `dd/mm/YYYY`, `Heure` is the slot label the
/// editors fill in (e.g. "9h"), `Message` the text to publish verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedEntry {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Heure")]
    pub slot: String,
    #[serde(rename = "Message")]
    pub message: String,
}

pub async fn fetch(client: &reqwest::Client, url: &str) -> Result<Vec<FeedEntry>> {
    let body = client
        .get(url)
        .send()
        .await
        .context("feed request failed")?
        .error_for_status()
        .context("feed returned an error status")?
        .text()
        .await
        .context("failed to read feed body")?;
    parse_feed(&body)
}

pub fn parse_feed(csv_text: &str) -> Result<Vec<FeedEntry>> {
    let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
    let mut entries = Vec::new();
    for (i, record) in reader.deserialize().enumerate() {
        let entry: FeedEntry =
            record.with_context(|| format!("bad feed row at line {}", i + 2))?;
        entries.push(entry);
    }
    Ok(entries)
}

/// The entry to publish for `day` in the slot labelled `label`, if the feed
/// carries one with a non-empty message.
pub fn entry_for<'a>(
    entries: &'a [FeedEntry],
    day: NaiveDate,
    label: &str,
) -> Option<&'a FeedEntry> {
    let wanted = day.format("%d/%m/%Y").to_string();
    entries
        .iter()
        .find(|e| e.date == wanted && e.slot == label && !e.message.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = "\
Date,Heure,Message
05/03/2024,9h,Morning picks are up!
05/03/2024,12h,
05/03/2024,20h,\"Tonight: PSG - OM, odds 1.85\"
06/03/2024,9h,Fresh picks tomorrow
";

    #[test]
    fn test_parse_feed_reads_all_rows() {
        let entries = parse_feed(FEED).unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].slot, "9h");
        assert_eq!(entries[2].message, "Tonight: PSG - OM, odds 1.85");
    }

    #[test]
    fn test_entry_for_matches_day_and_slot() {
        let entries = parse_feed(FEED).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let entry = entry_for(&entries, day, "9h").unwrap();
        assert_eq!(entry.message, "Morning picks are up!");
    }

    #[test]
    fn test_entry_for_skips_empty_messages() {
        let entries = parse_feed(FEED).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert!(entry_for(&entries, day, "12h").is_none());
    }

    #[test]
    fn test_entry_for_unknown_day_is_none() {
        let entries = parse_feed(FEED).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert!(entry_for(&entries, day, "9h").is_none());
    }

    #[test]
    fn test_parse_feed_rejects_missing_columns() {
        let bad = "Date,Heure\n05/03/2024,9h\n";
        assert!(parse_feed(bad).is_err());
    }
}
