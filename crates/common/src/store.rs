//! Flat-table record store.
//!
//! Four CSV tables (users, matches, bets, follows), fixed column headers,
//! one record per line. Every read loads the full table; every mutation
//! rewrites the full file (atomically, via a sibling temp file + rename).
//! The string encoding of typed fields lives here and nowhere else.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::{Bet, BetStatus, Follow, Prediction, PredictionStatus, TaskId, User};

/// One parsed CSV line with access to fields by header name, so tables stay
/// readable even if a future migration reorders columns.
pub struct Row<'a> {
    header: &'a csv::StringRecord,
    record: &'a csv::StringRecord,
}

impl Row<'_> {
    pub fn get(&self, name: &str) -> Result<&str> {
        let idx = self
            .header
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("missing column '{name}'"))?;
        self.record
            .get(idx)
            .with_context(|| format!("row too short for column '{name}'"))
    }
}

/// A type persisted as one CSV table.
pub trait TableRecord: Sized {
    const FILE_NAME: &'static str;
    const HEADER: &'static [&'static str];

    fn to_record(&self) -> Vec<String>;
    fn from_row(row: &Row<'_>) -> Result<Self>;
}

pub struct CsvStore {
    data_dir: PathBuf,
}

impl CsvStore {
    /// Open the store at `data_dir`, creating the directory and header-only
    /// table files when absent.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create data dir: {}", data_dir.display()))?;
        let store = Self { data_dir };
        store.ensure_table::<User>()?;
        store.ensure_table::<Prediction>()?;
        store.ensure_table::<Bet>()?;
        store.ensure_table::<Follow>()?;
        Ok(store)
    }

    fn table_path<T: TableRecord>(&self) -> PathBuf {
        self.data_dir.join(T::FILE_NAME)
    }

    fn ensure_table<T: TableRecord>(&self) -> Result<()> {
        let path = self.table_path::<T>();
        if !path.exists() {
            write_table_file::<T>(&path, &[])?;
            tracing::info!(file = %path.display(), "created table file with headers");
        }
        Ok(())
    }

    /// Load every record in the table. A malformed row is an error with the
    /// offending line number, not a silent skip.
    pub fn load_all<T: TableRecord>(&self) -> Result<Vec<T>> {
        let path = self.table_path::<T>();
        self.ensure_table::<T>()?;
        let mut reader = csv::Reader::from_path(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let header = reader
            .headers()
            .with_context(|| format!("failed to read headers of {}", T::FILE_NAME))?
            .clone();

        let mut rows = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record =
                record.with_context(|| format!("{}: unreadable line {}", T::FILE_NAME, i + 2))?;
            let row = Row {
                header: &header,
                record: &record,
            };
            let parsed = T::from_row(&row)
                .with_context(|| format!("{}: bad record at line {}", T::FILE_NAME, i + 2))?;
            rows.push(parsed);
        }
        Ok(rows)
    }

    /// Replace the whole table. Writes a sibling temp file and renames it
    /// into place so a crash mid-write cannot truncate the table.
    pub fn rewrite_all<T: TableRecord>(&self, rows: &[T]) -> Result<()> {
        let path = self.table_path::<T>();
        let tmp = path.with_extension("csv.tmp");
        write_table_file::<T>(&tmp, rows)?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }

    /// Append one record without rewriting the table.
    pub fn append<T: TableRecord>(&self, row: &T) -> Result<()> {
        self.ensure_table::<T>()?;
        let path = self.table_path::<T>();
        let file = fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open {} for append", path.display()))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer
            .write_record(row.to_record())
            .with_context(|| format!("failed to append to {}", T::FILE_NAME))?;
        writer.flush()?;
        Ok(())
    }
}

fn write_table_file<T: TableRecord>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer.write_record(T::HEADER)?;
    for row in rows {
        writer.write_record(row.to_record())?;
    }
    writer.flush()?;
    Ok(())
}

// --- string encoding helpers (storage boundary only) ---

fn opt_str(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn parse_opt(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn join_set<I: IntoIterator<Item = String>>(items: I) -> String {
    items.into_iter().collect::<Vec<_>>().join(",")
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("bad date '{s}'"))
}

fn parse_opt_date(s: &str) -> Result<Option<NaiveDate>> {
    if s.is_empty() {
        Ok(None)
    } else {
        parse_date(s).map(Some)
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("bad timestamp '{s}'"))?
        .with_timezone(&Utc))
}

fn parse_opt_timestamp(s: &str) -> Result<Option<DateTime<Utc>>> {
    if s.is_empty() {
        Ok(None)
    } else {
        parse_timestamp(s).map(Some)
    }
}

impl TableRecord for User {
    const FILE_NAME: &'static str = "users.csv";
    const HEADER: &'static [&'static str] = &[
        "user_id",
        "pseudo",
        "join_date",
        "xp",
        "level",
        "balance",
        "email",
        "last_daily_claim",
        "last_ad_claim",
        "unlocked",
        "bet_count",
        "claimed_tasks",
        "first_name",
        "last_name",
        "username",
    ];

    fn to_record(&self) -> Vec<String> {
        vec![
            self.user_id.clone(),
            self.pseudo.clone(),
            self.join_date.format("%Y-%m-%d").to_string(),
            self.xp.to_string(),
            self.level.to_string(),
            self.balance.to_string(),
            opt_str(&self.email),
            self.last_daily_claim
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            self.last_ad_claim
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
            join_set(self.unlocked.iter().cloned()),
            self.bet_count.to_string(),
            join_set(self.claimed_tasks.iter().map(|t| t.as_str().to_string())),
            opt_str(&self.first_name),
            opt_str(&self.last_name),
            opt_str(&self.username),
        ]
    }

    fn from_row(row: &Row<'_>) -> Result<Self> {
        let unlocked: BTreeSet<String> = row
            .get("unlocked")?
            .split(',')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        let mut claimed_tasks = BTreeSet::new();
        for id in row.get("claimed_tasks")?.split(',').filter(|s| !s.is_empty()) {
            let task = TaskId::parse(id).with_context(|| format!("unknown task id '{id}'"))?;
            claimed_tasks.insert(task);
        }

        Ok(Self {
            user_id: row.get("user_id")?.to_string(),
            pseudo: row.get("pseudo")?.to_string(),
            join_date: parse_date(row.get("join_date")?)?,
            xp: row.get("xp")?.parse().context("bad xp")?,
            level: row.get("level")?.parse().context("bad level")?,
            balance: row.get("balance")?.parse().context("bad balance")?,
            email: parse_opt(row.get("email")?),
            last_daily_claim: parse_opt_date(row.get("last_daily_claim")?)?,
            last_ad_claim: parse_opt_timestamp(row.get("last_ad_claim")?)?,
            unlocked,
            bet_count: row.get("bet_count")?.parse().context("bad bet_count")?,
            claimed_tasks,
            first_name: parse_opt(row.get("first_name")?),
            last_name: parse_opt(row.get("last_name")?),
            username: parse_opt(row.get("username")?),
        })
    }
}

impl TableRecord for Prediction {
    const FILE_NAME: &'static str = "matches.csv";
    const HEADER: &'static [&'static str] =
        &["match_id", "date", "time", "name", "pick", "odds", "status"];

    fn to_record(&self) -> Vec<String> {
        vec![
            self.match_id.clone(),
            self.date.format("%Y-%m-%d").to_string(),
            self.time.clone(),
            self.name.clone(),
            self.pick.clone(),
            self.odds.to_string(),
            self.status.as_str().to_string(),
        ]
    }

    fn from_row(row: &Row<'_>) -> Result<Self> {
        let status_str = row.get("status")?;
        let Some(status) = PredictionStatus::parse(status_str) else {
            bail!("unknown prediction status '{status_str}'");
        };
        Ok(Self {
            match_id: row.get("match_id")?.to_string(),
            date: parse_date(row.get("date")?)?,
            time: row.get("time")?.to_string(),
            name: row.get("name")?.to_string(),
            pick: row.get("pick")?.to_string(),
            odds: row.get("odds")?.parse().context("bad odds")?,
            status,
        })
    }
}

impl TableRecord for Bet {
    const FILE_NAME: &'static str = "bets.csv";
    const HEADER: &'static [&'static str] = &[
        "bet_id",
        "user_id",
        "match_id",
        "match_name",
        "placed_at",
        "stake",
        "status",
        "odds",
        "pick",
        "payout",
    ];

    fn to_record(&self) -> Vec<String> {
        vec![
            self.bet_id.clone(),
            self.user_id.clone(),
            self.match_id.clone(),
            self.match_name.clone(),
            self.placed_at.to_rfc3339(),
            self.stake.to_string(),
            self.status.as_str().to_string(),
            self.odds.to_string(),
            self.pick.clone(),
            self.payout.to_string(),
        ]
    }

    fn from_row(row: &Row<'_>) -> Result<Self> {
        let status_str = row.get("status")?;
        let Some(status) = BetStatus::parse(status_str) else {
            bail!("unknown bet status '{status_str}'");
        };
        Ok(Self {
            bet_id: row.get("bet_id")?.to_string(),
            user_id: row.get("user_id")?.to_string(),
            match_id: row.get("match_id")?.to_string(),
            match_name: row.get("match_name")?.to_string(),
            placed_at: parse_timestamp(row.get("placed_at")?)?,
            stake: row.get("stake")?.parse().context("bad stake")?,
            status,
            odds: row.get("odds")?.parse().context("bad odds")?,
            pick: row.get("pick")?.to_string(),
            payout: row.get("payout")?.parse().context("bad payout")?,
        })
    }
}

impl TableRecord for Follow {
    const FILE_NAME: &'static str = "follows.csv";
    const HEADER: &'static [&'static str] = &["user_id", "match_id", "followed_at"];

    fn to_record(&self) -> Vec<String> {
        vec![
            self.user_id.clone(),
            self.match_id.clone(),
            self.followed_at.to_rfc3339(),
        ]
    }

    fn from_row(row: &Row<'_>) -> Result<Self> {
        Ok(Self {
            user_id: row.get("user_id")?.to_string(),
            match_id: row.get("match_id")?.to_string(),
            followed_at: parse_timestamp(row.get("followed_at")?)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_user() -> User {
        let join = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut user = User::new("abc123def", "Tipster", join, 40);
        user.xp = 120;
        user.level = 2;
        user.email = Some("tipster@example.com".to_string());
        user.last_daily_claim = NaiveDate::from_ymd_opt(2024, 3, 2);
        user.last_ad_claim = Some(Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap());
        user.unlocked.insert("m1".to_string());
        user.unlocked.insert("m2".to_string());
        user.bet_count = 3;
        user.claimed_tasks.insert(TaskId::Pseudo);
        user.claimed_tasks.insert(TaskId::ThreeBets);
        user.username = Some("tipster".to_string());
        user
    }

    #[test]
    fn test_open_creates_header_only_tables() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::open(dir.path()).unwrap();
        let users: Vec<User> = store.load_all().unwrap();
        assert!(users.is_empty());
        let content = std::fs::read_to_string(dir.path().join("users.csv")).unwrap();
        assert!(content.starts_with("user_id,pseudo,join_date"));
    }

    #[test]
    fn test_user_survives_rewrite_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::open(dir.path()).unwrap();
        let user = sample_user();
        store.rewrite_all(std::slice::from_ref(&user)).unwrap();
        let loaded: Vec<User> = store.load_all().unwrap();
        assert_eq!(loaded, vec![user]);
    }

    #[test]
    fn test_empty_optionals_stay_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::open(dir.path()).unwrap();
        let join = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let user = User::new("u1", "User_u1", join, 50);
        store.rewrite_all(&[user]).unwrap();
        let loaded: Vec<User> = store.load_all().unwrap();
        assert!(loaded[0].email.is_none());
        assert!(loaded[0].last_daily_claim.is_none());
        assert!(loaded[0].last_ad_claim.is_none());
        assert!(loaded[0].unlocked.is_empty());
    }

    #[test]
    fn test_append_then_load_bets() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::open(dir.path()).unwrap();
        let bet = Bet {
            bet_id: "b1".to_string(),
            user_id: "u1".to_string(),
            match_id: "m1".to_string(),
            match_name: "PSG - OM".to_string(),
            placed_at: Utc.with_ymd_and_hms(2024, 3, 2, 18, 30, 0).unwrap(),
            stake: 10,
            status: BetStatus::Open,
            odds: 1.85,
            pick: "PSG wins".to_string(),
            payout: 0,
        };
        store.append(&bet).unwrap();
        store.append(&bet).unwrap();
        let loaded: Vec<Bet> = store.load_all().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0], bet);
    }

    #[test]
    fn test_prediction_round_trip_with_comma_in_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::open(dir.path()).unwrap();
        let prediction = Prediction {
            match_id: "m1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            time: "21:00".to_string(),
            name: "Nadal, R. - Federer, R.".to_string(),
            pick: "over 2.5 sets".to_string(),
            odds: 2.1,
            status: PredictionStatus::Upcoming,
        };
        store.rewrite_all(std::slice::from_ref(&prediction)).unwrap();
        let loaded: Vec<Prediction> = store.load_all().unwrap();
        assert_eq!(loaded, vec![prediction]);
    }

    #[test]
    fn test_bad_row_reports_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::open(dir.path()).unwrap();
        std::fs::write(
            dir.path().join("matches.csv"),
            "match_id,date,time,name,pick,odds,status\nm1,2024-03-05,21:00,A - B,pick,not_a_number,upcoming\n",
        )
        .unwrap();
        let err = store.load_all::<Prediction>().unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[test]
    fn test_rewrite_replaces_not_appends() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::open(dir.path()).unwrap();
        let user = sample_user();
        store.rewrite_all(std::slice::from_ref(&user)).unwrap();
        store.rewrite_all(std::slice::from_ref(&user)).unwrap();
        let loaded: Vec<User> = store.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
    }
}
