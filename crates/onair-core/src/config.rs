use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:54321";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RETRIES: u32 = 2; // transport-level, connectivity errors only
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;

pub const DEFAULT_LOOK_AHEAD_MINUTES: i32 = 30;
pub const DEFAULT_LOOK_BEHIND_MINUTES: i32 = 15;
pub const DEFAULT_LATE_CUTOFF_MINUTES: i32 = 15;

pub const DEFAULT_REFRESH_SECS: u64 = 60;
pub const DEFAULT_EXACT_POLL_SECS: u64 = 15;
pub const DEFAULT_PROBE_SECS: u64 = 30;

/// Top-level config (onair.toml + ONAIR_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OnairConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub agenda: AgendaConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Hosted database endpoint (PostgREST-style REST + auth API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub url: String,
    /// Project API key, sent as the `apikey` header on every request.
    #[serde(default)]
    pub api_key: String,
    /// Session token of the signed-in announcer. Without it there is no
    /// current actor and mark-as-read fails with `Unauthenticated`.
    pub access_token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            api_key: String::new(),
            access_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retries: DEFAULT_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

/// Which column decides whether an item recurs daily.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecurrencePolicy {
    /// Only the `recurring` boolean column counts.
    ExplicitFlag,
    /// The flag, or an `end_date` later than the item's first day.
    #[default]
    FlagOrDateRange,
}

/// Urgency thresholds and recurrence rules for agenda resolution.
///
/// An item is "upcoming" while `-look_behind <= minutes_until_due <= look_ahead`
/// and is dropped once it is more than `late_cutoff` minutes overdue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgendaConfig {
    #[serde(default = "default_look_ahead")]
    pub look_ahead_minutes: i32,
    #[serde(default = "default_look_behind")]
    pub look_behind_minutes: i32,
    #[serde(default = "default_late_cutoff")]
    pub late_cutoff_minutes: i32,
    #[serde(default)]
    pub recurrence: RecurrencePolicy,
}

impl Default for AgendaConfig {
    fn default() -> Self {
        Self {
            look_ahead_minutes: DEFAULT_LOOK_AHEAD_MINUTES,
            look_behind_minutes: DEFAULT_LOOK_BEHIND_MINUTES,
            late_cutoff_minutes: DEFAULT_LATE_CUTOFF_MINUTES,
            recurrence: RecurrencePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Full fetch → resolve cycle.
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
    /// In-memory rescan for exact-time alerts.
    #[serde(default = "default_exact_poll_secs")]
    pub exact_poll_secs: u64,
    /// Connectivity probe cadence of the connection monitor.
    #[serde(default = "default_probe_secs")]
    pub probe_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            refresh_secs: DEFAULT_REFRESH_SECS,
            exact_poll_secs: DEFAULT_EXACT_POLL_SECS,
            probe_secs: DEFAULT_PROBE_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_path")]
    pub path: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
        }
    }
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_retries() -> u32 {
    DEFAULT_RETRIES
}
fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}
fn default_look_ahead() -> i32 {
    DEFAULT_LOOK_AHEAD_MINUTES
}
fn default_look_behind() -> i32 {
    DEFAULT_LOOK_BEHIND_MINUTES
}
fn default_late_cutoff() -> i32 {
    DEFAULT_LATE_CUTOFF_MINUTES
}
fn default_refresh_secs() -> u64 {
    DEFAULT_REFRESH_SECS
}
fn default_exact_poll_secs() -> u64 {
    DEFAULT_EXACT_POLL_SECS
}
fn default_probe_secs() -> u64 {
    DEFAULT_PROBE_SECS
}
fn default_cache_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.onair/read_cache.db", home)
}

impl OnairConfig {
    /// Load config from a TOML file with ONAIR_* env var overrides.
    ///
    /// Nested keys use a double underscore, e.g.
    /// `ONAIR_AGENDA__LOOK_AHEAD_MINUTES=20`. A missing file is not an
    /// error; every field has a default.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: OnairConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("ONAIR_").split("__"))
            .extract()
            .map_err(|e| crate::error::OnairError::Config(e.to_string()))?;

        config.validate()?;
        tracing::debug!(path = %path, backend = %config.backend.url, "config loaded");
        Ok(config)
    }

    fn validate(&self) -> crate::error::Result<()> {
        let a = &self.agenda;
        if a.look_ahead_minutes < 0 || a.look_behind_minutes < 0 || a.late_cutoff_minutes < 0 {
            return Err(crate::error::OnairError::Config(
                "agenda thresholds must be non-negative".to_string(),
            ));
        }
        let s = &self.scheduler;
        if s.refresh_secs == 0 || s.exact_poll_secs == 0 || s.probe_secs == 0 {
            return Err(crate::error::OnairError::Config(
                "scheduler periods must be at least one second".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.onair/onair.toml", home)
}
