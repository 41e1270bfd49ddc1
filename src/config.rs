//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and every field is optional; an empty file yields
//! [`Config::default`], which matches the stock Steam Deck device layout.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::error::{DeckInputError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub devices: DeviceConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Device path configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DeviceConfig {
    /// evdev node whose power/volume keys are recorded
    #[serde(default = "default_key_device")]
    pub key_device: String,

    /// evdev nodes grabbed only to keep their presses from other consumers
    #[serde(default = "default_muted_devices")]
    pub muted_devices: Vec<String>,

    /// hidraw node of the controller
    #[serde(default = "default_hidraw")]
    pub hidraw: String,

    /// Read buffer size for raw reports
    #[serde(default = "default_report_size")]
    pub report_size: usize,
}

/// Loop timing configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TimingConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_open_retries")]
    pub open_retries: u32,

    #[serde(default = "default_open_retry_delay_ms")]
    pub open_retry_delay_ms: u64,
}

/// Axis debounce thresholds
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ThresholdConfig {
    #[serde(default = "default_stick_threshold")]
    pub stick: i32,

    #[serde(default = "default_pad_threshold")]
    pub pad: i32,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily rolling log files; empty logs to stdout
    #[serde(default)]
    pub directory: String,
}

/// Change output configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct OutputConfig {
    #[serde(default = "default_output_format")]
    pub format: String,
}

// Default value functions
fn default_key_device() -> String { "/dev/input/event5".to_string() }
fn default_muted_devices() -> Vec<String> {
    vec![
        "/dev/input/event2".to_string(),
        "/dev/input/event8".to_string(),
        "/dev/input/event14".to_string(),
    ]
}
fn default_hidraw() -> String { "/dev/hidraw2".to_string() }
fn default_report_size() -> usize { 64 }

fn default_tick_interval_ms() -> u64 { 1 }
fn default_read_timeout_ms() -> u64 { 5 }
fn default_poll_interval_ms() -> u64 { 1 }
fn default_open_retries() -> u32 { 0 }
fn default_open_retry_delay_ms() -> u64 { 500 }

fn default_stick_threshold() -> i32 { 200 }
fn default_pad_threshold() -> i32 { 100 }

fn default_log_level() -> String { "info".to_string() }
fn default_output_format() -> String { "log".to_string() }

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            key_device: default_key_device(),
            muted_devices: default_muted_devices(),
            hidraw: default_hidraw(),
            report_size: default_report_size(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            open_retries: default_open_retries(),
            open_retry_delay_ms: default_open_retry_delay_ms(),
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            stick: default_stick_threshold(),
            pad: default_pad_threshold(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_output_format(),
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> DeckInputError {
    DeckInputError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use deck_input::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Validate device paths
        if self.devices.key_device.is_empty() {
            return Err(invalid("key_device cannot be empty"));
        }

        if self.devices.hidraw.is_empty() {
            return Err(invalid("hidraw path cannot be empty"));
        }

        for path in &self.devices.muted_devices {
            if path.is_empty() {
                return Err(invalid("muted_devices entries cannot be empty"));
            }
            if *path == self.devices.key_device {
                return Err(invalid(format!("{} is both key_device and muted", path)));
            }
        }

        if self.devices.report_size < 64 || self.devices.report_size > 1024 {
            return Err(invalid("report_size must be between 64 and 1024"));
        }

        // Validate timing fields
        for (name, value) in [
            ("tick_interval_ms", self.timing.tick_interval_ms),
            ("read_timeout_ms", self.timing.read_timeout_ms),
            ("poll_interval_ms", self.timing.poll_interval_ms),
        ] {
            if value == 0 || value > 1000 {
                return Err(invalid(format!("{} must be between 1 and 1000", name)));
            }
        }

        if self.timing.open_retries > 10 {
            return Err(invalid("open_retries must be at most 10"));
        }

        if self.timing.open_retry_delay_ms == 0 || self.timing.open_retry_delay_ms > 60000 {
            return Err(invalid("open_retry_delay_ms must be between 1 and 60000"));
        }

        // Validate thresholds (axis values are signed 16-bit)
        for (name, value) in [("stick", self.thresholds.stick), ("pad", self.thresholds.pad)] {
            if !(0..=i16::MAX as i32).contains(&value) {
                return Err(invalid(format!("{} threshold must be between 0 and 32767", name)));
            }
        }

        // Validate logging
        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(invalid("log level must be one of: trace, debug, info, warn, error"));
        }

        if !["log", "jsonl"].contains(&self.output.format.as_str()) {
            return Err(invalid("output format must be 'log' or 'jsonl'"));
        }

        Ok(())
    }
}
