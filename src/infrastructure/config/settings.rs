use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub i18n: I18nConfig,
    #[serde(default)]
    pub otel: OtelConfig,
}

/// Ops endpoint (health and metrics) listener
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Pub/Sub channels carrying "post created" messages
    #[serde(default = "default_trigger_channels")]
    pub channels: Vec<String>,
    /// Prefix of the channels commands are published to
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
}

/// Where subscribers are looked up
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    /// "memory" or "redis"
    #[serde(default = "default_directory_backend")]
    pub backend: String,
    #[serde(default = "default_directory_prefix")]
    pub redis_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Maximum number of tasks running at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Maximum number of tasks waiting to run
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct I18nConfig {
    #[serde(default = "default_locale")]
    pub default_locale: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8082
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_trigger_channels() -> Vec<String> {
    vec!["feedback:post.created".to_string()]
}

fn default_command_prefix() -> String {
    "feedback:commands".to_string()
}

fn default_directory_backend() -> String {
    "memory".to_string()
}

fn default_directory_prefix() -> String {
    "feedback:directory".to_string()
}

fn default_concurrency() -> usize {
    8
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_locale() -> String {
    "en".to_string()
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "feedback-notifier".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        Self::load(env_source())
    }

    fn load(environment: Environment) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8082)?
            .set_default("redis.url", "redis://localhost:6379")?
            .set_default("redis.command_prefix", "feedback:commands")?
            .set_default("directory.backend", "memory")?
            .set_default("worker.concurrency", 8)?
            .set_default("worker.queue_capacity", 1024)?
            .set_default("i18n.default_locale", "en")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(environment);

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// FEEDBACK_SERVER__PORT, FEEDBACK_WORKER__QUEUE_CAPACITY, FEEDBACK_REDIS__CHANNELS, etc.
fn env_source() -> Environment {
    Environment::with_prefix("FEEDBACK")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("redis.channels")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            channels: default_trigger_channels(),
            command_prefix: default_command_prefix(),
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            backend: default_directory_backend(),
            redis_prefix: default_directory_prefix(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Default for I18nConfig {
    fn default() -> Self {
        Self {
            default_locale: default_locale(),
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_service_name(),
            sampling_ratio: default_sampling_ratio(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let server = ServerConfig::default();
        assert_eq!(server.host, "0.0.0.0");
        assert_eq!(server.port, 8082);

        let redis = RedisConfig::default();
        assert_eq!(redis.channels, vec!["feedback:post.created".to_string()]);
        assert_eq!(redis.command_prefix, "feedback:commands");

        let worker = WorkerConfig::default();
        assert_eq!(worker.concurrency, 8);
        assert_eq!(worker.queue_capacity, 1024);
    }

    #[test]
    fn test_otel_disabled_by_default() {
        let otel = OtelConfig::default();
        assert!(!otel.enabled);
        assert_eq!(otel.service_name, "feedback-notifier");
    }

    #[test]
    fn test_empty_source_deserializes_with_defaults() {
        let settings: Settings = Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.directory.backend, "memory");
        assert_eq!(settings.i18n.default_locale, "en");
        assert_eq!(settings.server_addr(), "0.0.0.0:8082");
    }

    fn env_with(vars: &[(&str, &str)]) -> Environment {
        let map = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        env_source().source(Some(map))
    }

    #[test]
    fn test_env_overrides_multi_word_keys() {
        let settings = Settings::load(env_with(&[
            ("FEEDBACK_WORKER__QUEUE_CAPACITY", "5"),
            ("FEEDBACK_WORKER__CONCURRENCY", "3"),
            ("FEEDBACK_DIRECTORY__REDIS_PREFIX", "acme:dir"),
            ("FEEDBACK_REDIS__COMMAND_PREFIX", "acme:commands"),
            ("FEEDBACK_I18N__DEFAULT_LOCALE", "pt-BR"),
            ("FEEDBACK_OTEL__SAMPLING_RATIO", "0.25"),
        ]))
        .unwrap();

        assert_eq!(settings.worker.queue_capacity, 5);
        assert_eq!(settings.worker.concurrency, 3);
        assert_eq!(settings.directory.redis_prefix, "acme:dir");
        assert_eq!(settings.redis.command_prefix, "acme:commands");
        assert_eq!(settings.i18n.default_locale, "pt-BR");
        assert_eq!(settings.otel.sampling_ratio, 0.25);
    }

    #[test]
    fn test_env_channels_parse_as_list() {
        let settings = Settings::load(env_with(&[(
            "FEEDBACK_REDIS__CHANNELS",
            "acme:post.created,beta:post.created",
        )]))
        .unwrap();

        assert_eq!(
            settings.redis.channels,
            vec!["acme:post.created".to_string(), "beta:post.created".to_string()]
        );
    }

    #[test]
    fn test_unprefixed_env_is_ignored() {
        let settings = Settings::load(env_with(&[("WORKER_QUEUE_CAPACITY", "5")])).unwrap();
        assert_eq!(settings.worker.queue_capacity, 1024);
    }
}
