use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the batch transcriber
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// File conditioning settings
    pub conditioning: ConditioningConfig,

    /// Transcription backend settings
    pub transcription: TranscriptionConfig,

    /// Output settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditioningConfig {
    /// Maximum file size in bytes before a file is split
    pub max_file_size: u64,

    /// Maximum duration of one split segment in seconds
    pub max_segment_duration: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Whisper model name
    pub model: String,

    /// Explicit path to a whisper.cpp model file
    pub model_path: Option<PathBuf>,

    /// Language hint passed to the backend
    pub language: Option<String>,

    /// Timeout for one transcription call (seconds)
    pub timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Write the run report as JSON to this path after processing
    pub report_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from file, falling back to environment overrides
    /// over the defaults.
    pub fn load() -> Result<Self> {
        let config_paths = [
            "audio-transcriber.toml",
            "config/audio-transcriber.toml",
            "~/.config/audio-transcriber/config.toml",
            "/etc/audio-transcriber/config.toml",
        ];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str(&config_str) {
                    Ok(config) => {
                        tracing::info!("Loaded configuration from: {}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(max_size) = std::env::var("AUDIO_TRANSCRIBER_MAX_FILE_SIZE") {
            config.conditioning.max_file_size =
                max_size.parse().unwrap_or(config.conditioning.max_file_size);
        }

        if let Ok(duration) = std::env::var("AUDIO_TRANSCRIBER_SEGMENT_DURATION") {
            config.conditioning.max_segment_duration = duration
                .parse()
                .unwrap_or(config.conditioning.max_segment_duration);
        }

        if let Ok(model) = std::env::var("AUDIO_TRANSCRIBER_MODEL") {
            config.transcription.model = model;
        }

        if let Ok(language) = std::env::var("AUDIO_TRANSCRIBER_LANGUAGE") {
            config.transcription.language = Some(language);
        }

        if let Ok(report_file) = std::env::var("AUDIO_TRANSCRIBER_REPORT_FILE") {
            config.output.report_file = Some(PathBuf::from(report_file));
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("Configuration saved to: {}", path);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.conditioning.max_file_size == 0 {
            return Err(anyhow!("max_file_size must be greater than 0"));
        }

        if self.conditioning.max_segment_duration == 0 {
            return Err(anyhow!("max_segment_duration must be greater than 0"));
        }

        if self.transcription.model.is_empty() {
            return Err(anyhow!("transcription model must not be empty"));
        }

        if self.transcription.timeout == 0 {
            return Err(anyhow!("transcription timeout must be greater than 0"));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            conditioning: ConditioningConfig {
                max_file_size: 25 * 1024 * 1024,
                max_segment_duration: 20 * 60,
            },
            transcription: TranscriptionConfig {
                model: "large".to_string(),
                model_path: None,
                language: Some("en".to_string()),
                timeout: 3600,
            },
            output: OutputConfig { report_file: None },
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.config.conditioning.max_file_size = bytes;
        self
    }

    pub fn with_max_segment_duration(mut self, seconds: u64) -> Self {
        self.config.conditioning.max_segment_duration = seconds;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.transcription.model = model.into();
        self
    }

    pub fn with_model_path(mut self, path: PathBuf) -> Self {
        self.config.transcription.model_path = Some(path);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.config.transcription.language = Some(language.into());
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.config.transcription.timeout = seconds;
        self
    }

    pub fn with_report_file(mut self, path: PathBuf) -> Self {
        self.config.output.report_file = Some(path);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.conditioning.max_file_size, 25 * 1024 * 1024);
        assert_eq!(config.conditioning.max_segment_duration, 1200);
        assert_eq!(config.transcription.model, "large");
        assert_eq!(config.transcription.language.as_deref(), Some("en"));
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_max_file_size(5 * 1024)
            .with_max_segment_duration(60)
            .with_model("base")
            .with_language("de")
            .build();

        assert_eq!(config.conditioning.max_file_size, 5 * 1024);
        assert_eq!(config.conditioning.max_segment_duration, 60);
        assert_eq!(config.transcription.model, "base");
        assert_eq!(config.transcription.language.as_deref(), Some("de"));
    }

    #[test]
    fn test_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());

        let mut broken = Config::default();
        broken.conditioning.max_segment_duration = 0;
        assert!(broken.validate().is_err());

        let mut broken = Config::default();
        broken.transcription.model = String::new();
        assert!(broken.validate().is_err());
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let restored: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(
            restored.conditioning.max_file_size,
            config.conditioning.max_file_size
        );
        assert_eq!(restored.transcription.model, config.transcription.model);
    }
}
