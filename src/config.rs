use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub birthdays: BirthdaysConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StateConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "birthdaybot.db".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotifierConfig {
    /// How often the reminder job wakes up.
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    /// Local wall-clock time before which nothing is sent, "HH:MM".
    #[serde(default = "default_time_of_day")]
    pub time_of_day: String,
    /// IANA timezone the bot's calendar runs in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_lock_lease_secs")]
    pub lock_lease_secs: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
            time_of_day: default_time_of_day(),
            timezone: default_timezone(),
            lock_lease_secs: default_lock_lease_secs(),
        }
    }
}

fn default_tick_interval_secs() -> u64 {
    600
}

fn default_time_of_day() -> String {
    "10:00".to_string()
}

fn default_timezone() -> String {
    "Europe/Moscow".to_string()
}

fn default_lock_lease_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct BirthdaysConfig {
    /// How many entries /next_birthdays shows at most.
    #[serde(default = "default_upcoming_limit")]
    pub upcoming_limit: usize,
}

impl Default for BirthdaysConfig {
    fn default() -> Self {
        Self {
            upcoming_limit: default_upcoming_limit(),
        }
    }
}

fn default_upcoming_limit() -> usize {
    6
}

impl AppConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [telegram]
            bot_token = "123:abc"
            "#,
        )
        .unwrap();

        assert_eq!(config.telegram.bot_token, "123:abc");
        assert_eq!(config.state.db_path, "birthdaybot.db");
        assert_eq!(config.notifier.tick_interval_secs, 600);
        assert_eq!(config.notifier.time_of_day, "10:00");
        assert_eq!(config.notifier.timezone, "Europe/Moscow");
        assert_eq!(config.notifier.lock_lease_secs, 60);
        assert_eq!(config.birthdays.upcoming_limit, 6);
    }

    #[test]
    fn overrides_are_honored() {
        let config: AppConfig = toml::from_str(
            r#"
            [telegram]
            bot_token = "123:abc"

            [state]
            db_path = "/var/lib/bot/bot.db"

            [notifier]
            tick_interval_secs = 60
            time_of_day = "08:30"
            timezone = "America/New_York"

            [birthdays]
            upcoming_limit = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.state.db_path, "/var/lib/bot/bot.db");
        assert_eq!(config.notifier.tick_interval_secs, 60);
        assert_eq!(config.notifier.time_of_day, "08:30");
        assert_eq!(config.notifier.timezone, "America/New_York");
        assert_eq!(config.birthdays.upcoming_limit, 10);
    }

    #[test]
    fn missing_bot_token_is_an_error() {
        assert!(toml::from_str::<AppConfig>("[telegram]\n").is_err());
    }

    #[test]
    fn load_reads_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[telegram]\nbot_token = \"t\"\n").unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.telegram.bot_token, "t");
    }
}
