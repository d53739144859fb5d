use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable that points the daemon at a non-default config file.
pub const CONFIG_ENV_VAR: &str = "HOMEFRAME_CONFIG";

/// Top-level configuration loaded from `~/.homeframe/config.toml`.
///
/// Every section falls back to its defaults, so a partial file (or no file
/// at all) yields a working configuration for a stock Raspberry Pi setup.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub presence: PresenceConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub slideshow: SlideshowConfig,
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub flags: FlagsConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

impl Config {
    /// Load config from `$HOMEFRAME_CONFIG` or `~/.homeframe/config.toml`,
    /// falling back to defaults when the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::resolve_path();
        if path.exists() {
            Self::load_from(path)
        } else {
            tracing::info!(path = %path.display(), "no config file found, using defaults");
            let cfg = Config::default();
            cfg.validate()?;
            Ok(cfg)
        }
    }

    /// Load from a specific path.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let text = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let cfg: Config = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        self.validate()?;
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Semantic validation for settings that are not fully expressible via type checks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.presence.validate()?;
        self.schedule.validate()?;
        self.monitor.validate()?;
        self.slideshow.validate()?;
        self.system.validate()?;
        self.dashboard.validate()?;
        Ok(())
    }

    /// The config file the daemon reads: `$HOMEFRAME_CONFIG` when set,
    /// otherwise `~/.homeframe/config.toml`.
    pub fn resolve_path() -> PathBuf {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(p) if !p.trim().is_empty() => PathBuf::from(p),
            _ => Self::default_path(),
        }
    }

    fn default_path() -> PathBuf {
        home_dir().join(".homeframe").join("config.toml")
    }
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(String),
    #[error("parse: {0}")]
    Parse(String),
    #[error("validation: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Section structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::Pretty,
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

/// Addresses and timeouts for the two presence signals.
///
/// An empty address disables the corresponding signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    #[serde(default)]
    pub wifi_mac: String,
    #[serde(default)]
    pub bluetooth_mac: String,
    #[serde(default = "default_subnet")]
    pub subnet: String,
    #[serde(default = "default_wifi_timeout")]
    pub wifi_timeout_secs: u64,
    #[serde(default = "default_bluetooth_timeout")]
    pub bluetooth_timeout_secs: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            wifi_mac: String::new(),
            bluetooth_mac: String::new(),
            subnet: default_subnet(),
            wifi_timeout_secs: default_wifi_timeout(),
            bluetooth_timeout_secs: default_bluetooth_timeout(),
        }
    }
}

impl PresenceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, mac) in [
            ("presence.wifi_mac", &self.wifi_mac),
            ("presence.bluetooth_mac", &self.bluetooth_mac),
        ] {
            if !mac.is_empty() && !is_mac_address(mac) {
                return Err(ConfigError::Validation(format!(
                    "{field} '{mac}' is not a colon-separated hardware address"
                )));
            }
        }
        if self.subnet.trim().is_empty() {
            return Err(ConfigError::Validation(
                "presence.subnet must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// True when at least one presence signal is configured.
    pub fn has_signal(&self) -> bool {
        !self.wifi_mac.is_empty() || !self.bluetooth_mac.is_empty()
    }
}

fn is_mac_address(s: &str) -> bool {
    let parts: Vec<&str> = s.split(':').collect();
    parts.len() == 6
        && parts
            .iter()
            .all(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_hexdigit()))
}

fn default_subnet() -> String {
    "192.168.1.0/24".into()
}
fn default_wifi_timeout() -> u64 {
    60
}
fn default_bluetooth_timeout() -> u64 {
    10
}

/// Active-hours window, daily reset hour and every wait the poller performs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_active_start")]
    pub active_start_hour: u32,
    #[serde(default = "default_active_end")]
    pub active_end_hour: u32,
    #[serde(default = "default_reset_hour")]
    pub daily_reset_hour: u32,
    #[serde(default = "default_startup_delay")]
    pub startup_delay_secs: u64,
    #[serde(default = "default_home_interval")]
    pub home_interval_secs: u64,
    #[serde(default = "default_away_interval")]
    pub away_interval_secs: u64,
    #[serde(default = "default_sleeping_interval")]
    pub sleeping_interval_secs: u64,
    #[serde(default = "default_confirm_delay")]
    pub confirm_delay_secs: u64,
    #[serde(default = "default_manual_pause")]
    pub manual_pause_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            active_start_hour: default_active_start(),
            active_end_hour: default_active_end(),
            daily_reset_hour: default_reset_hour(),
            startup_delay_secs: default_startup_delay(),
            home_interval_secs: default_home_interval(),
            away_interval_secs: default_away_interval(),
            sleeping_interval_secs: default_sleeping_interval(),
            confirm_delay_secs: default_confirm_delay(),
            manual_pause_secs: default_manual_pause(),
        }
    }
}

impl ScheduleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.active_end_hour > 24 {
            return Err(ConfigError::Validation(format!(
                "schedule.active_end_hour must be <= 24, got {}",
                self.active_end_hour
            )));
        }
        if self.active_start_hour >= self.active_end_hour {
            return Err(ConfigError::Validation(format!(
                "schedule.active_start_hour ({}) must be before active_end_hour ({})",
                self.active_start_hour, self.active_end_hour
            )));
        }
        if self.daily_reset_hour > 23 {
            return Err(ConfigError::Validation(format!(
                "schedule.daily_reset_hour must be <= 23, got {}",
                self.daily_reset_hour
            )));
        }
        Ok(())
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay_secs)
    }
    pub fn home_interval(&self) -> Duration {
        Duration::from_secs(self.home_interval_secs)
    }
    pub fn away_interval(&self) -> Duration {
        Duration::from_secs(self.away_interval_secs)
    }
    pub fn sleeping_interval(&self) -> Duration {
        Duration::from_secs(self.sleeping_interval_secs)
    }
    pub fn confirm_delay(&self) -> Duration {
        Duration::from_secs(self.confirm_delay_secs)
    }
    pub fn manual_pause(&self) -> Duration {
        Duration::from_secs(self.manual_pause_secs)
    }
}

fn default_active_start() -> u32 {
    8
}
fn default_active_end() -> u32 {
    23
}
fn default_reset_hour() -> u32 {
    8
}
fn default_startup_delay() -> u64 {
    10
}
fn default_home_interval() -> u64 {
    300
}
fn default_away_interval() -> u64 {
    60
}
fn default_sleeping_interval() -> u64 {
    1800
}
fn default_confirm_delay() -> u64 {
    300
}
fn default_manual_pause() -> u64 {
    60
}

/// The graphical session display commands run against.
///
/// Attached to each display and slideshow invocation as per-command
/// environment; the daemon's own environment is never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySession {
    #[serde(default = "default_x_display")]
    pub display: String,
    #[serde(default = "default_xdg_runtime_dir")]
    pub xdg_runtime_dir: String,
}

impl Default for DisplaySession {
    fn default() -> Self {
        Self {
            display: default_x_display(),
            xdg_runtime_dir: default_xdg_runtime_dir(),
        }
    }
}

impl DisplaySession {
    /// Environment pairs to set on a child process.
    pub fn env(&self) -> [(&'static str, &str); 2] {
        [
            ("DISPLAY", self.display.as_str()),
            ("XDG_RUNTIME_DIR", self.xdg_runtime_dir.as_str()),
        ]
    }
}

fn default_x_display() -> String {
    ":0".into()
}
fn default_xdg_runtime_dir() -> String {
    "/run/user/1000".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_output")]
    pub output: String,
    #[serde(default = "default_output_mode")]
    pub mode: String,
    #[serde(default)]
    pub session: DisplaySession,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            mode: default_output_mode(),
            session: DisplaySession::default(),
        }
    }
}

fn default_output() -> String {
    "HDMI-A-1".into()
}
fn default_output_mode() -> String {
    "1920x1080".into()
}

/// DDC/CI settings for the attached monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// ddcutil `--bus` number; autodetected when unset.
    #[serde(default)]
    pub bus: Option<u8>,
    #[serde(default = "default_brightness_feature")]
    pub brightness_feature: String,
    #[serde(default = "default_input_feature")]
    pub input_feature: String,
    /// Input source value the monitor reports when this device is selected.
    #[serde(default = "default_expected_input")]
    pub expected_input: u16,
    #[serde(default = "default_brightness")]
    pub default_brightness: u8,
    #[serde(default = "default_true")]
    pub power_off_requires_active_source: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            bus: None,
            brightness_feature: default_brightness_feature(),
            input_feature: default_input_feature(),
            expected_input: default_expected_input(),
            default_brightness: default_brightness(),
            power_off_requires_active_source: true,
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_brightness > 100 {
            return Err(ConfigError::Validation(format!(
                "monitor.default_brightness must be within 0..=100, got {}",
                self.default_brightness
            )));
        }
        if self.brightness_feature.trim().is_empty() || self.input_feature.trim().is_empty() {
            return Err(ConfigError::Validation(
                "monitor feature codes must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_brightness_feature() -> String {
    "10".into()
}
fn default_input_feature() -> String {
    "60".into()
}
fn default_expected_input() -> u16 {
    // 0x11, HDMI-1 in the MCCS input source table
    17
}
fn default_brightness() -> u8 {
    50
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideshowConfig {
    #[serde(default = "default_start_command")]
    pub start_command: PathBuf,
    /// Pattern handed to `pgrep -f` / `pkill -f`.
    #[serde(default = "default_process_pattern")]
    pub process_pattern: String,
    /// How long the slideshow gets to load before the display is powered on.
    #[serde(default = "default_warmup")]
    pub warmup_secs: u64,
}

impl Default for SlideshowConfig {
    fn default() -> Self {
        Self {
            start_command: default_start_command(),
            process_pattern: default_process_pattern(),
            warmup_secs: default_warmup(),
        }
    }
}

impl SlideshowConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.process_pattern.trim().is_empty() {
            return Err(ConfigError::Validation(
                "slideshow.process_pattern must not be empty".to_string(),
            ));
        }
        if self.start_command.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "slideshow.start_command must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_secs(self.warmup_secs)
    }
}

fn default_start_command() -> PathBuf {
    home_dir().join("start_picframe.sh")
}
fn default_process_pattern() -> String {
    "picframe".into()
}
fn default_warmup() -> u64 {
    20
}

/// Package update and reboot commands run once a day when nobody is home.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_true")]
    pub auto_update: bool,
    /// Prefix privileged commands with `sudo`.
    #[serde(default = "default_true")]
    pub use_sudo: bool,
    #[serde(default = "default_update_steps")]
    pub update_steps: Vec<Vec<String>>,
    #[serde(default = "default_reboot_command")]
    pub reboot_command: Vec<String>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            auto_update: true,
            use_sudo: true,
            update_steps: default_update_steps(),
            reboot_command: default_reboot_command(),
        }
    }
}

impl SystemConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reboot_command.is_empty() {
            return Err(ConfigError::Validation(
                "system.reboot_command must not be empty".to_string(),
            ));
        }
        if self.update_steps.iter().any(|step| step.is_empty()) {
            return Err(ConfigError::Validation(
                "system.update_steps must not contain empty commands".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_update_steps() -> Vec<Vec<String>> {
    vec![
        vec!["apt-get".into(), "update".into()],
        vec!["apt-get".into(), "upgrade".into(), "-y".into()],
    ]
}
fn default_reboot_command() -> Vec<String> {
    vec!["reboot".into()]
}

/// Location of the marker files.
///
/// They live in the home directory by default because `/tmp` is wiped on
/// reboot and the reboot flag has to survive one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlagsConfig {
    #[serde(default = "home_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_override_file")]
    pub manual_override_file: String,
    #[serde(default = "default_reboot_file")]
    pub reboot_done_file: String,
}

impl Default for FlagsConfig {
    fn default() -> Self {
        Self {
            dir: home_dir(),
            manual_override_file: default_override_file(),
            reboot_done_file: default_reboot_file(),
        }
    }
}

impl FlagsConfig {
    pub fn manual_override_path(&self) -> PathBuf {
        self.dir.join(&self.manual_override_file)
    }
    pub fn reboot_done_path(&self) -> PathBuf {
        self.dir.join(&self.reboot_done_file)
    }
}

fn default_override_file() -> String {
    "manual_override.flag".into()
}
fn default_reboot_file() -> String {
    "reboot_done.flag".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_dashboard_host")]
    pub host: String,
    #[serde(default = "default_dashboard_port")]
    pub port: u16,
    #[serde(default = "default_stats_interval")]
    pub stats_interval_secs: u64,
    #[serde(default = "default_thermal_path")]
    pub thermal_path: PathBuf,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            host: default_dashboard_host(),
            port: default_dashboard_port(),
            stats_interval_secs: default_stats_interval(),
            thermal_path: default_thermal_path(),
        }
    }
}

impl DashboardConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Validation(
                "dashboard.port must not be 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_dashboard_host() -> String {
    "0.0.0.0".into()
}
fn default_dashboard_port() -> u16 {
    5000
}
fn default_stats_interval() -> u64 {
    2
}
fn default_thermal_path() -> PathBuf {
    PathBuf::from("/sys/class/thermal/thermal_zone0/temp")
}
