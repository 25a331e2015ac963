//! [`Config`]-related definitions.

use std::time;

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use serde::Deserialize;
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service configuration.
    pub service: Service,

    /// Logging configuration.
    pub log: Log,
}

impl Config {
    /// Gathers a new [`Config`], with environment variables (`CONF.*`)
    /// overriding the file at the provided `path` (if it exists), and default
    /// values filling whatever is left unset.
    ///
    /// # Errors
    ///
    /// If the gathered values cannot be deserialized into a [`Config`].
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }
}

/// Service configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Service {
    /// Service tasks configuration.
    pub tasks: Tasks,
}

impl From<Service> for service::Config {
    fn from(value: Service) -> Self {
        let Service {
            tasks: Tasks { sweep_reservations },
        } = value;
        Self {
            sweep_reservations: service::task::sweep_reservations::Config {
                interval: sweep_reservations.interval,
            },
        }
    }
}

/// Configuration of [`Service`] background tasks.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Tasks {
    /// `SweepReservations` task configuration.
    pub sweep_reservations: Task,
}

/// Configuration of a single periodic task.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Task {
    /// Interval between executions of the task.
    #[default(time::Duration::from_secs(60))]
    #[serde(with = "humantime_serde")]
    pub interval: time::Duration,
}

/// Logging configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Minimum level of emitted log entries.
    pub level: LogLevel,
}

/// Level of a log entry.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Step-by-step execution details.
    Trace,

    /// Information useful when debugging only.
    Debug,

    /// Regular operational information.
    #[default]
    Info,

    /// Suspicious, yet recoverable, situations.
    Warn,

    /// Failures the application cannot recover on its own.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}
