// Configuration management with layered configuration (file, env)

use crate::errors::ScheduleError;
use chrono_tz::Tz;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Main settings structure containing all configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    pub scheduler: SchedulerConfig,
    pub assistant: AssistantConfig,
    pub hansard: HansardConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_seconds: u64,
    #[serde(default)]
    pub run_migrations: bool,
}

/// Redis is only used for the distributed schedule lock; without a URL the
/// processor falls back to an in-process lock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared secret expected in `Authorization: Bearer <secret>`
    pub cron_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub poll_interval_seconds: u64,
    pub lock_ttl_seconds: u64,
    pub max_schedules_per_run: usize,
    /// IANA zone used for "local" recurrence times
    #[serde(default = "default_timezone_name")]
    pub timezone: String,
}

/// Value shipped in `Default`; never accepted as a real secret
const PLACEHOLDER_CRON_SECRET: &str = "change-me-in-production";

fn default_timezone_name() -> String {
    "Europe/London".to_string()
}

impl SchedulerConfig {
    pub fn timezone(&self) -> Result<Tz, ScheduleError> {
        Tz::from_str(&self.timezone)
            .map_err(|e| ScheduleError::InvalidTimezone(format!("'{}': {}", self.timezone, e)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    pub api_key: String,
    #[serde(default = "default_assistant_base_url")]
    pub base_url: String,
    pub default_assistant_id: String,
    #[serde(default = "default_run_poll_interval_ms")]
    pub run_poll_interval_ms: u64,
    #[serde(default = "default_run_max_wait_seconds")]
    pub run_max_wait_seconds: u64,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_assistant_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_run_poll_interval_ms() -> u64 {
    1000
}

fn default_run_max_wait_seconds() -> u64 {
    300
}

fn default_request_timeout_seconds() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HansardConfig {
    #[serde(default = "default_hansard_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_hansard_base_url() -> String {
    "https://hansard-api.parliament.uk".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub metrics_port: u16,
    pub tracing_endpoint: Option<String>,
}

impl Settings {
    /// Load configuration with layered precedence: defaults → file → env
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Local overrides (not committed to git)
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("Server port must be greater than 0".to_string());
        }

        if self.database.url.is_empty() {
            return Err("Database URL cannot be empty".to_string());
        }
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }

        if let Some(url) = &self.redis.url {
            if url.is_empty() {
                return Err("Redis URL cannot be empty when set".to_string());
            }
        }

        if self.auth.cron_secret == PLACEHOLDER_CRON_SECRET {
            return Err("Cron secret must be overridden (APP__AUTH__CRON_SECRET)".to_string());
        }
        if self.auth.cron_secret.is_empty() {
            return Err("Cron secret cannot be empty".to_string());
        }

        if self.scheduler.poll_interval_seconds == 0 {
            return Err("Scheduler poll_interval_seconds must be greater than 0".to_string());
        }
        if self.scheduler.lock_ttl_seconds == 0 {
            return Err("Scheduler lock_ttl_seconds must be greater than 0".to_string());
        }
        if self.scheduler.max_schedules_per_run == 0 {
            return Err("Scheduler max_schedules_per_run must be greater than 0".to_string());
        }
        self.scheduler.timezone().map_err(|e| e.to_string())?;

        if self.assistant.default_assistant_id.is_empty() {
            return Err("Assistant default_assistant_id cannot be empty".to_string());
        }
        if self.assistant.run_poll_interval_ms == 0 {
            return Err("Assistant run_poll_interval_ms must be greater than 0".to_string());
        }
        if self.assistant.run_max_wait_seconds == 0 {
            return Err("Assistant run_max_wait_seconds must be greater than 0".to_string());
        }

        if self.hansard.base_url.is_empty() {
            return Err("Hansard base_url cannot be empty".to_string());
        }

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/whatgov".to_string(),
                max_connections: 10,
                min_connections: 2,
                connect_timeout_seconds: 30,
                run_migrations: false,
            },
            redis: RedisConfig::default(),
            auth: AuthConfig {
                cron_secret: PLACEHOLDER_CRON_SECRET.to_string(),
            },
            scheduler: SchedulerConfig {
                poll_interval_seconds: 300,
                lock_ttl_seconds: 600,
                max_schedules_per_run: 100,
                timezone: default_timezone_name(),
            },
            assistant: AssistantConfig {
                api_key: String::new(),
                base_url: default_assistant_base_url(),
                default_assistant_id: "asst_default".to_string(),
                run_poll_interval_ms: default_run_poll_interval_ms(),
                run_max_wait_seconds: default_run_max_wait_seconds(),
                request_timeout_seconds: default_request_timeout_seconds(),
            },
            hansard: HansardConfig {
                base_url: default_hansard_base_url(),
                request_timeout_seconds: default_request_timeout_seconds(),
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                metrics_port: 9090,
                tracing_endpoint: None,
            },
        }
    }
}
