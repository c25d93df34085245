use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_location_name() -> String {
    "Islamabad".to_string()
}
fn default_calc_method() -> String {
    "MuslimWorldLeague".to_string()
}
fn default_madhab() -> String {
    "Hanafi".to_string()
}
fn default_timezone_offset() -> i32 {
    300
}
fn default_api_base_url() -> String {
    "http://localhost:5000".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_min_interval_ms() -> u64 {
    1000
}
fn default_cooldown_ms() -> u64 {
    200
}
fn default_base_delay_ms() -> u64 {
    1000
}
fn default_max_delay_ms() -> u64 {
    30_000
}
fn default_max_retries() -> usize {
    3
}
fn default_aladhan_url() -> String {
    "https://api.aladhan.com/v1".to_string()
}
fn default_foreground_tick_secs() -> u64 {
    15
}
fn default_background_interval_secs() -> u64 {
    15 * 60
}
fn default_channel() -> String {
    "prayer-times".to_string()
}
fn default_sound() -> String {
    "adhan".to_string()
}
fn default_priority() -> String {
    "high".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimetableSourceKind {
    /// Computed locally from coordinates.
    #[default]
    Offline,
    /// Fetched from the Aladhan prayer-times API.
    Aladhan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalahConfig {
    #[serde(default = "default_location_name")]
    pub location_name: String,
    /// Unset until `hisn setup` has been run.
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default = "default_calc_method")]
    pub calc_method: String,
    #[serde(default = "default_madhab")]
    pub madhab: String,
    #[serde(default = "default_timezone_offset")]
    pub timezone_offset: i32, // minutes from UTC
    /// Days to add/subtract from Hijri date for local moon sighting.
    #[serde(default)]
    pub hijri_offset: i32,
    #[serde(default)]
    pub source: TimetableSourceKind,
}

impl Default for SalahConfig {
    fn default() -> Self {
        Self {
            location_name: default_location_name(),
            latitude: None,
            longitude: None,
            calc_method: default_calc_method(),
            madhab: default_madhab(),
            timezone_offset: default_timezone_offset(),
            hijri_offset: 0,
            source: TimetableSourceKind::default(),
        }
    }
}

/// Backend connection and request-queue tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Minimum spacing between two request starts.
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    /// Pause after every successful request.
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    /// First backoff delay after a 429; doubled on each further 429.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            timeout_secs: default_timeout_secs(),
            min_interval_ms: default_min_interval_ms(),
            cooldown_ms: default_cooldown_ms(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimetableApiConfig {
    #[serde(default = "default_aladhan_url")]
    pub aladhan_url: String,
}

impl Default for TimetableApiConfig {
    fn default() -> Self {
        Self {
            aladhan_url: default_aladhan_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// How often the foreground loop checks for due notifications.
    #[serde(default = "default_foreground_tick_secs")]
    pub foreground_tick_secs: u64,
    /// Periodic background resync. Values under 15 minutes are raised to 15.
    #[serde(default = "default_background_interval_secs")]
    pub background_interval_secs: u64,
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default = "default_sound")]
    pub sound: String,
    #[serde(default = "default_priority")]
    pub priority: String,
}

impl NotificationsConfig {
    pub const MIN_BACKGROUND_INTERVAL: Duration = Duration::from_secs(15 * 60);

    pub fn foreground_tick(&self) -> Duration {
        Duration::from_secs(self.foreground_tick_secs.max(1))
    }

    pub fn background_interval(&self) -> Duration {
        Duration::from_secs(self.background_interval_secs).max(Self::MIN_BACKGROUND_INTERVAL)
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            foreground_tick_secs: default_foreground_tick_secs(),
            background_interval_secs: default_background_interval_secs(),
            channel: default_channel(),
            sound: default_sound(),
            priority: default_priority(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub salah: SalahConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub timetable_api: TimetableApiConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

impl AppConfig {
    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("", "", "hisn").context("Could not determine project directories")
    }

    pub fn config_path() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn data_dir() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.data_dir().to_path_buf())
    }

    pub fn db_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("hisn.db"))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Reading {:?}", path))?;
        let config: AppConfig = toml::from_str(&content).context("Parsing config.toml")?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).context("Serializing config")?;
        std::fs::write(path, content).with_context(|| format!("Writing {:?}", path))?;
        Ok(())
    }

    pub fn ensure_data_dir() -> Result<PathBuf> {
        let dir = Self::data_dir()?;
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}
