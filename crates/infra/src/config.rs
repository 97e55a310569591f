use std::{fmt, str::FromStr, time::Duration};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    /// Which storage backend to use: `memory` or `db`
    pub storage: String,
    /// Postgres connection string, required by the `db` storage
    pub database_url: Option<String>,
    /// Which broker transport to use: `memory` or `amqp`
    pub broker_kind: String,
    pub scheduler: SchedulerConfig,
    pub broker: BrokerConfig,
    /// How long the background jobs get to finish after shutdown was requested
    pub shutdown_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Name of the queue carrying pending reminders. The acknowledgements
    /// travel on `<queue>_ACK`.
    pub queue: String,
    /// How often to look for events that should be reminded about
    pub period: Duration,
    /// Events that took place longer ago than this are deleted
    pub retention_period: Duration,
    /// How often the retention sweep runs
    pub retention_interval: Duration,
}

impl SchedulerConfig {
    pub fn ack_queue(&self) -> String {
        format!("{}_ACK", self.queue)
    }
}

#[derive(Clone)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub login: String,
    pub password: String,
}

impl BrokerConfig {
    pub fn connection_string(&self) -> String {
        format!(
            "amqp://{}:{}@{}:{}/",
            self.login, self.password, self.host, self.port
        )
    }
}

impl fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("login", &self.login)
            .field("password", &"***")
            .finish()
    }
}

/// Reads `key` from the environment. A missing variable silently gives
/// `default`, an unparsable one gives `default` with a warning.
fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr + fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => match value.parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(
                    "The given {}: {} is not valid, falling back to the default: {}.",
                    key, value, default
                );
                default
            }
        },
        Err(_) => default,
    }
}

/// Longest duration any setting accepts, about a hundred years
const MAX_DURATION_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Like `env_or` for a duration counted in `unit_secs` steps. Zero and
/// durations longer than `MAX_DURATION_SECS` fall back to `default` too.
fn env_duration(key: &str, default: u64, unit_secs: u64) -> Duration {
    let value = env_or(key, default);
    match value.checked_mul(unit_secs) {
        Some(secs) if secs > 0 && secs <= MAX_DURATION_SECS => Duration::from_secs(secs),
        _ => {
            warn!(
                "The given {}: {} is out of range, falling back to the default: {}.",
                key, value, default
            );
            Duration::from_secs(default * unit_secs)
        }
    }
}

fn env_secs(key: &str, default: u64) -> Duration {
    env_duration(key, default, 1)
}

fn env_hours(key: &str, default: u64) -> Duration {
    env_duration(key, default, 60 * 60)
}

impl Config {
    pub fn new() -> Self {
        let scheduler = SchedulerConfig {
            queue: env_or("SCHEDULER_QUEUE", "scheduler".to_string()),
            period: env_secs("SCHEDULER_PERIOD_SECS", 3),
            retention_period: env_hours("SCHEDULER_RETENTION_PERIOD_HOURS", 24 * 365),
            retention_interval: env_secs("SCHEDULER_RETENTION_INTERVAL_SECS", 60 * 60),
        };
        let broker = BrokerConfig {
            host: env_or("RMQ_HOST", "localhost".to_string()),
            port: env_or("RMQ_PORT", 5672),
            login: env_or("RMQ_LOGIN", "guest".to_string()),
            password: env_or("RMQ_PASSWORD", "guest".to_string()),
        };

        Self {
            storage: env_or("STORAGE", "memory".to_string()),
            database_url: std::env::var("DATABASE_URL").ok(),
            broker_kind: env_or("BROKER", "memory".to_string()),
            scheduler,
            broker,
            shutdown_timeout: env_secs("SHUTDOWN_TIMEOUT_SECS", 3),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
