//! Configuration management with YAML support

use anyhow::{anyhow, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::model::Zone;
use crate::queue::QueuePolicy;
use crate::reconcile::ReconcileMode;
use crate::schedule::{Calendar, CallingBlock, ScheduleTable};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub dialer: DialerConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub sources: HashMap<String, SourceConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,

    /// How long a write waits for the database lock before giving up
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

/// Retry and queue policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialerConfig {
    #[serde(default = "default_max_attempts")]
    pub default_max_attempts: u32,

    #[serde(default = "default_callback_cap")]
    pub callback_cap: u32,

    #[serde(default = "default_queue_limit")]
    pub queue_limit: u32,

    /// Hold queued leads back until their retry time has passed
    #[serde(default)]
    pub honor_retry_backoff: bool,
}

/// Scheduling cascade configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// IANA name of the zone the block hours are expressed in
    #[serde(default = "default_reference_timezone")]
    pub reference_timezone: String,

    #[serde(default = "default_blocks")]
    pub blocks: Vec<BlockConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockConfig {
    pub hour: u32,
    pub zone: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// Individual lead source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// File path or glob pattern
    pub path: String,

    #[serde(default)]
    pub mode: ReconcileMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_database_path() -> String {
    "~/.local/share/dialer/dialer.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_max_attempts() -> u32 {
    5
}

fn default_callback_cap() -> u32 {
    10
}

fn default_queue_limit() -> u32 {
    50
}

fn default_enabled() -> bool {
    true
}

fn default_reference_timezone() -> String {
    "America/New_York".to_string()
}

fn default_blocks() -> Vec<BlockConfig> {
    ScheduleTable::default_blocks()
        .into_iter()
        .map(|b| BlockConfig {
            hour: b.hour,
            zone: b.zone.as_str().to_string(),
            label: Some(b.label),
        })
        .collect()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl Default for DialerConfig {
    fn default() -> Self {
        Self {
            default_max_attempts: default_max_attempts(),
            callback_cap: default_callback_cap(),
            queue_limit: default_queue_limit(),
            honor_retry_backoff: false,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            reference_timezone: default_reference_timezone(),
            blocks: default_blocks(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    /// Searches in order:
    /// 1. Provided path
    /// 2. ./dialer.yaml (current directory)
    /// 3. <config dir>/dialer/dialer.yaml
    pub fn load(path: &str) -> Result<Self> {
        let mut search_paths = vec![
            PathBuf::from(shellexpand::tilde(path).to_string()),
            PathBuf::from("dialer.yaml"),
        ];
        if let Some(dir) = dirs::config_dir() {
            search_paths.push(dir.join("dialer").join("dialer.yaml"));
        }

        for search_path in &search_paths {
            if search_path.exists() {
                let content = std::fs::read_to_string(search_path)?;
                let config: Config = serde_yaml::from_str(&content)?;
                return Ok(config);
            }
        }

        // No config file found, use defaults
        Ok(Config::default())
    }

    /// Get the database path, expanding ~ to home directory
    pub fn database_path(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.database.path).to_string();
        PathBuf::from(expanded)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.database.busy_timeout_ms)
    }

    pub fn queue_policy(&self) -> QueuePolicy {
        QueuePolicy {
            callback_cap: self.dialer.callback_cap,
            honor_retry_backoff: self.dialer.honor_retry_backoff,
        }
    }

    pub fn calendar(&self) -> Result<Calendar> {
        let tz: Tz = self
            .schedule
            .reference_timezone
            .parse()
            .map_err(|e| anyhow!("invalid reference_timezone: {}", e))?;
        Ok(Calendar::new(tz))
    }

    /// Validate the block table and build the runtime schedule
    pub fn schedule_table(&self) -> Result<ScheduleTable> {
        let mut blocks = Vec::with_capacity(self.schedule.blocks.len());
        for block in &self.schedule.blocks {
            if block.hour > 23 {
                return Err(anyhow!("schedule block hour {} is out of range", block.hour));
            }
            if blocks.iter().any(|b: &CallingBlock| b.hour == block.hour) {
                return Err(anyhow!("schedule hour {} listed twice", block.hour));
            }
            let zone: Zone = block.zone.parse()?;
            let label = block
                .label
                .clone()
                .unwrap_or_else(|| format!("{} block", zone));
            blocks.push(CallingBlock::new(block.hour, zone, label));
        }
        Ok(ScheduleTable::new(self.calendar()?, blocks))
    }

    /// Check if a source is enabled
    pub fn is_source_enabled(&self, name: &str) -> bool {
        self.sources.get(name).map_or(false, |s| s.enabled)
    }
}
