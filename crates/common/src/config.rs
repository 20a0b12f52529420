use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub economy: EconomyConfig,
    pub bot: Option<BotConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    #[serde(default = "default_cache_ttl_secs")]
    pub matches_cache_ttl_secs: u64,
}

/// Gamification rule constants. Amounts are in coins unless the field name
/// says XP. Defaults match the published reward schedule.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    pub initial_balance: u64,
    pub unlock_cost: u64,
    pub bet_stake: u64,
    pub xp_per_bet: u64,
    pub xp_per_unlock: u64,
    pub daily_reward_coins: u64,
    pub daily_reward_xp: u64,
    pub ad_reward_coins: u64,
    pub ad_reward_xp: u64,
    pub ad_cooldown_secs: u64,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            initial_balance: 50,
            unlock_cost: 10,
            bet_stake: 10,
            xp_per_bet: 1,
            xp_per_unlock: 2,
            daily_reward_coins: 5,
            daily_reward_xp: 5,
            ad_reward_coins: 1,
            ad_reward_xp: 1,
            ad_cooldown_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub feed_url: String,
    pub post_slots: Vec<PostSlot>,
}

/// One daily posting job: fire at `time` (local, "HH:MM") and publish the
/// feed entry labelled `label`.
#[derive(Debug, Clone, Deserialize)]
pub struct PostSlot {
    pub time: String,
    pub label: String,
}

fn default_cache_ttl_secs() -> u64 {
    300
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {path}"))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.server.port > 0, "server.port must be > 0");
        anyhow::ensure!(
            !self.storage.data_dir.is_empty(),
            "storage.data_dir must not be empty"
        );
        anyhow::ensure!(self.economy.bet_stake > 0, "economy.bet_stake must be > 0");
        anyhow::ensure!(
            self.economy.unlock_cost > 0,
            "economy.unlock_cost must be > 0"
        );
        if let Some(bot) = &self.bot {
            anyhow::ensure!(!bot.feed_url.is_empty(), "bot.feed_url must not be empty");
            for slot in &bot.post_slots {
                anyhow::ensure!(
                    chrono::NaiveTime::parse_from_str(&slot.time, "%H:%M").is_ok(),
                    "bot.post_slots time '{}' is not HH:MM",
                    slot.time
                );
            }
        }
        Ok(())
    }

    pub fn default_config_path() -> String {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(std::path::Path::to_path_buf));

        // Check next to the binary first
        if let Some(dir) = &exe_dir {
            let candidate = dir.join("default.toml");
            if candidate.exists() {
                return candidate.to_string_lossy().to_string();
            }
        }

        // Check config/ directory relative to cwd
        let candidate = Path::new("config/default.toml");
        if candidate.exists() {
            return candidate.to_string_lossy().to_string();
        }

        // Fallback
        "config/default.toml".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> &'static str {
        r#"
[server]
port = 5001
host = "0.0.0.0"

[storage]
data_dir = "data"
matches_cache_ttl_secs = 300

[economy]
initial_balance = 50
unlock_cost = 10
bet_stake = 10

[bot]
feed_url = "https://example.com/feed.csv"
post_slots = [
    { time = "09:00", label = "9h" },
    { time = "12:00", label = "12h" },
    { time = "20:00", label = "20h" },
]
"#
    }

    #[test]
    fn test_parse_valid_config() {
        let config = Config::from_toml_str(sample_config()).unwrap();
        assert_eq!(config.server.port, 5001);
        assert_eq!(config.storage.data_dir, "data");
        assert_eq!(config.storage.matches_cache_ttl_secs, 300);
        assert_eq!(config.economy.initial_balance, 50);
        let bot = config.bot.expect("bot section should be present");
        assert_eq!(bot.post_slots.len(), 3);
        assert_eq!(bot.post_slots[0].label, "9h");
    }

    #[test]
    fn test_economy_defaults_fill_omitted_fields() {
        let config = Config::from_toml_str(
            r#"
[server]
port = 5001
host = "127.0.0.1"

[storage]
data_dir = "data"
"#,
        )
        .unwrap();
        assert_eq!(config.economy.initial_balance, 50);
        assert_eq!(config.economy.daily_reward_coins, 5);
        assert_eq!(config.economy.ad_cooldown_secs, 3600);
        assert!(config.bot.is_none());
    }

    #[test]
    fn test_validate_zero_stake() {
        let content = sample_config().replace("bet_stake = 10", "bet_stake = 0");
        let result = Config::from_toml_str(&content);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("bet_stake must be > 0"));
    }

    #[test]
    fn test_validate_bad_slot_time() {
        let content = sample_config().replace("09:00", "9am");
        let result = Config::from_toml_str(&content);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not HH:MM"));
    }

    #[test]
    fn test_parse_invalid_config_missing_section() {
        let bad = "
[server]
port = 5001
";
        assert!(Config::from_toml_str(bad).is_err());
    }

    #[test]
    fn test_load_default_config() {
        let config = Config::from_toml_str(include_str!("../../../config/default.toml")).unwrap();
        assert_eq!(config.server.port, 5001);
        assert!(config.bot.is_some());
    }
}
