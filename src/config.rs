use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file {0}: {1}")]
    Read(String, std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub aws: AwsConfig,
    pub s3: S3Config,
    pub queue: QueueConfig,
    #[serde(default)]
    pub face: FaceConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AwsConfig {
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub endpoint: Option<String>,
    pub bucket: String,
    #[serde(default)]
    pub force_path_style: bool,
    #[serde(default = "default_upload_url_ttl")]
    pub upload_url_ttl_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    pub queue_url: Option<String>,
    pub queue_name: Option<String>,
    pub endpoint: Option<String>,
    #[serde(default = "default_max_messages")]
    pub max_messages: i32,
    #[serde(default = "default_wait_time")]
    pub wait_time_seconds: i32,
    pub visibility_timeout_seconds: Option<i32>,
    #[serde(default = "default_poll_backoff")]
    pub poll_backoff_seconds: u64,
    #[serde(default = "default_max_poll_backoff")]
    pub max_poll_backoff_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FaceConfig {
    pub endpoint: Option<String>,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_call_timeout")]
    pub call_timeout_seconds: u64,
    #[serde(default = "default_message_timeout")]
    pub message_timeout_seconds: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            call_timeout_seconds: default_call_timeout(),
            message_timeout_seconds: default_message_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub path: String,
    /// Maximum size of one log file in MiB
    pub size: u64,
    pub max_files: usize,
}

impl QueueConfig {
    /// Batch size accepted by SQS (1..=10)
    pub fn batch_size(&self) -> i32 {
        self.max_messages.clamp(1, 10)
    }

    /// Long-poll wait accepted by SQS (0..=20 seconds)
    pub fn wait_time(&self) -> Duration {
        Duration::from_secs(self.wait_time_seconds.clamp(0, 20) as u64)
    }

    pub fn poll_backoff(&self) -> Duration {
        Duration::from_secs(self.poll_backoff_seconds)
    }

    pub fn max_poll_backoff(&self) -> Duration {
        Duration::from_secs(self.max_poll_backoff_seconds.max(self.poll_backoff_seconds))
    }
}

impl PipelineConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_seconds)
    }

    pub fn message_timeout(&self) -> Duration {
        Duration::from_secs(self.message_timeout_seconds)
    }
}

impl S3Config {
    pub fn upload_url_ttl(&self) -> Duration {
        Duration::from_secs(self.upload_url_ttl_seconds)
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue.queue_url.is_none() && self.queue.queue_name.is_none() {
            return Err(ConfigError::Invalid(
                "queue.queue_url or queue.queue_name must be set".to_string(),
            ));
        }
        if self.pipeline.call_timeout_seconds == 0 || self.pipeline.message_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "pipeline timeouts must be greater than zero".to_string(),
            ));
        }
        if self.queue.poll_backoff_seconds == 0 {
            return Err(ConfigError::Invalid(
                "queue.poll_backoff_seconds must be greater than zero".to_string(),
            ));
        }
        if self.s3.upload_url_ttl_seconds == 0 {
            return Err(ConfigError::Invalid(
                "s3.upload_url_ttl_seconds must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.face.similarity_threshold) {
            return Err(ConfigError::Invalid(format!(
                "face.similarity_threshold must be within 0..=100, got {}",
                self.face.similarity_threshold
            )));
        }
        Ok(())
    }
}

pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    let config_text =
        fs::read_to_string(Path::new(path)).map_err(|e| ConfigError::Read(path.to_string(), e))?;
    parse_config(&config_text)
}

pub fn parse_config(text: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
}

fn default_upload_url_ttl() -> u64 {
    300
}

fn default_max_messages() -> i32 {
    10
}

fn default_wait_time() -> i32 {
    20
}

fn default_poll_backoff() -> u64 {
    5
}

fn default_max_poll_backoff() -> u64 {
    60
}

fn default_similarity_threshold() -> f32 {
    80.0
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout() -> u64 {
    10
}

fn default_call_timeout() -> u64 {
    30
}

fn default_message_timeout() -> u64 {
    120
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
        [aws]
        region = "eu-west-1"

        [s3]
        bucket = "attendance-media"

        [queue]
        queue_name = "face-recognition-queue"

        [database]
        url = "sqlite::memory:"
    "#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = parse_config(MINIMAL).unwrap();

        assert_eq!(config.queue.batch_size(), 10);
        assert_eq!(config.queue.wait_time(), Duration::from_secs(20));
        assert_eq!(config.queue.poll_backoff(), Duration::from_secs(5));
        assert_eq!(config.s3.upload_url_ttl(), Duration::from_secs(300));
        assert_eq!(config.face.similarity_threshold, 80.0);
        assert_eq!(config.pipeline.call_timeout(), Duration::from_secs(30));
        assert_eq!(config.database.max_connections, 5);
        assert!(config.logging.is_none());
    }

    #[test]
    fn queue_limits_are_clamped_to_sqs_bounds() {
        let text = MINIMAL.replace(
            "queue_name = \"face-recognition-queue\"",
            "queue_url = \"http://localhost:4566/000000000000/faces\"\nmax_messages = 50\nwait_time_seconds = 90",
        );
        let config = parse_config(&text).unwrap();

        assert_eq!(config.queue.batch_size(), 10);
        assert_eq!(config.queue.wait_time(), Duration::from_secs(20));
    }

    #[test]
    fn missing_queue_locator_is_invalid() {
        let text = MINIMAL.replace("queue_name = \"face-recognition-queue\"", "");
        assert!(matches!(parse_config(&text), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_timeout_is_invalid() {
        let text = format!("{}\n[pipeline]\ncall_timeout_seconds = 0\n", MINIMAL);
        assert!(matches!(parse_config(&text), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_poll_backoff_is_invalid() {
        let text = MINIMAL.replace(
            "queue_name = \"face-recognition-queue\"",
            "queue_name = \"face-recognition-queue\"\npoll_backoff_seconds = 0\nmax_poll_backoff_seconds = 0",
        );
        assert!(matches!(parse_config(&text), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn load_config_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.s3.bucket, "attendance-media");
    }

    #[test]
    fn load_config_reports_missing_file() {
        assert!(matches!(
            load_config("/nonexistent/attendance.toml"),
            Err(ConfigError::Read(_, _))
        ));
    }
}
