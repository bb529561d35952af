use std::time::Duration;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub redis: RedisConfig,
    pub kafka: KafkaConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct KafkaConfig {
    pub broker: String,
    pub consumer_group: String,
    /// Bounded startup connection attempts before ingestion is disabled
    pub connect_max_attempts: u32,
    pub connect_retry_delay: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Config {
            app: AppConfig {
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                port: parse_env("APP_PORT", "8000")?,
            },
            redis: RedisConfig {
                url: std::env::var("REDIS_URL")
                    .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            },
            kafka: KafkaConfig {
                broker: std::env::var("KAFKA_BROKER").unwrap_or_else(|_| "kafka:9092".to_string()),
                consumer_group: std::env::var("KAFKA_CONSUMER_GROUP")
                    .unwrap_or_else(|_| "notification-service".to_string()),
                connect_max_attempts: parse_env("KAFKA_CONNECT_MAX_ATTEMPTS", "5")?,
                connect_retry_delay: Duration::from_secs(parse_env(
                    "KAFKA_CONNECT_RETRY_DELAY_SECS",
                    "3",
                )?),
            },
        })
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: &str) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    std::env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|e| AppError::Config(format!("invalid {}: {}", name, e)))
}
