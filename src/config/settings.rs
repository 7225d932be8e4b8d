use std::env;

use config::{Config, ConfigError, File};
use dotenv::dotenv;
use secrecy::SecretString;

use crate::config::redis::RedisSettings;
use crate::config::upstream::UpstreamSettings;

#[derive(Debug, serde::Deserialize)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub redis: RedisSettings,
    pub upstream: UpstreamSettings,
    pub poller: PollerSettings,
    pub sampler: SamplerSettings,
}

#[derive(Debug, serde::Deserialize)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, serde::Deserialize, Clone)]
pub struct PollerSettings {
    /// Seconds between live-stat polls.
    pub interval_seconds: u64,
    /// A cached snapshot younger than this skips downstream recomputation
    /// when its content is unchanged.
    pub freshness_seconds: u64,
}

#[derive(Debug, serde::Deserialize, Clone)]
pub struct SamplerSettings {
    /// Public league ids whose top entries seed each tier sample.
    pub seed_leagues: Vec<i64>,
    /// Managers aimed for per tier.
    pub per_tier_target: usize,
    /// Below this the sampler proceeds but logs a warning.
    pub min_sample_size: usize,
    /// Concurrent upstream fetches while sampling.
    pub fetch_concurrency: usize,
    /// Sample cache lifetime.
    pub cache_ttl_hours: u64,
    /// How long non-leader workers wait for the leader's sample.
    pub leader_wait_seconds: u64,
}

pub fn get_config() -> Result<Settings, ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");
    let configuration_directory = base_path.join("configuration");

    dotenv().ok();

    let environment: Environment = env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .expect("Failed to parse APP_ENVIRONMENT.");

    let env_filename = format!("{}.yml", environment.as_str());
    let config = Config::builder()
        .add_source(File::from(configuration_directory.join("base.yml")))
        .add_source(File::from(configuration_directory.join(env_filename)))
        .add_source(
            config::Environment::default()
                .prefix("APP")
                .prefix_separator("__")
                .separator("__"),
        )
        .add_source(
            config::Environment::default()
                .prefix("REDIS")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    let mut settings = config.try_deserialize::<Settings>()?;

    // Hosted deployments expose the full REDIS_URL directly.
    if let Ok(redis_url) = env::var("REDIS_URL") {
        settings.redis.url = Some(SecretString::new(redis_url.into_boxed_str()));
    }

    Ok(settings)
}

pub fn get_redis_url(settings: &Settings) -> SecretString {
    settings.redis.get_redis_url()
}

pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. \
                Use either `local` or `production`.",
                other
            )),
        }
    }
}
