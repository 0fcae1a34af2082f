use anyhow::{anyhow, Context, Result};
use log::warn;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Default target language offered to the user (a language name, e.g. "Chinese")
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Transcription config
    #[serde(default)]
    pub transcription: TranscriptionConfig,

    /// Media tooling config
    #[serde(default)]
    pub media: MediaConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Settings for the OpenAI-compatible translation endpoint
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    // @field: Endpoint base URL, without the /chat/completions suffix
    #[serde(default = "default_base_url")]
    pub base_url: String,

    // @field: API key, sent as a Bearer token when not empty
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Model name
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Temperature parameter for text generation (0.0 to 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Prompt used for marker-tagged batch requests
    /// Placeholder: {target_language}
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Prompt used when a single line is re-sent after its marker went missing.
    /// Empty means the batch prompt is reused.
    #[serde(default = "default_fallback_prompt")]
    pub fallback_prompt: String,

    /// Number of segments per batch request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            model_name: default_model_name(),
            temperature: default_temperature(),
            system_prompt: default_system_prompt(),
            fallback_prompt: default_fallback_prompt(),
            batch_size: default_batch_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Settings for the command-line transcriber
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranscriptionConfig {
    /// Transcriber executable (whisper.cpp CLI compatible)
    #[serde(default = "default_transcriber_binary")]
    pub binary: String,

    /// Path to the model file
    #[serde(default = "default_model_path")]
    pub model_path: String,

    /// Spoken language code, or None for auto-detection
    #[serde(default)]
    pub language: Option<String>,

    #[serde(default = "default_beam_size")]
    pub beam_size: u32,

    #[serde(default = "default_threads")]
    pub threads: u32,

    /// Keep the extracted `<media>.temp.wav` side-car after transcription
    #[serde(default = "default_true")]
    pub keep_audio: bool,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            binary: default_transcriber_binary(),
            model_path: default_model_path(),
            language: None,
            beam_size: default_beam_size(),
            threads: default_threads(),
            keep_audio: true,
        }
    }
}

/// Settings for ffmpeg
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MediaConfig {
    /// Explicit ffmpeg path; ignored when it does not exist
    #[serde(default)]
    pub ffmpeg_path: Option<String>,

    /// Timeout for audio extraction in seconds
    #[serde(default = "default_extract_timeout_secs")]
    pub extract_timeout_secs: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            extract_timeout_secs: default_extract_timeout_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_target_language() -> String {
    "Chinese".to_string()
}

fn default_base_url() -> String {
    "http://localhost:11434/v1".to_string()
}

fn default_model_name() -> String {
    "qwen2.5:7b".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_batch_size() -> usize {
    10
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_transcriber_binary() -> String {
    "whisper-cli".to_string()
}

fn default_model_path() -> String {
    "models/ggml-base.bin".to_string()
}

fn default_beam_size() -> u32 {
    5
}

fn default_threads() -> u32 {
    4
}

fn default_extract_timeout_secs() -> u64 {
    600
}

fn default_true() -> bool {
    true
}

fn default_system_prompt() -> String {
    "You are a professional subtitle translator. Translate every line into {target_language}. \
Each input line starts with a marker such as <L1>. Reply with exactly one translated line per input line, \
starting with the same marker. Do not merge, split, skip or explain lines."
        .to_string()
}

fn default_fallback_prompt() -> String {
    "You are a professional subtitle translator. Translate the following subtitle line into {target_language}. \
Reply with the translation only."
        .to_string()
}

/// Default location of the configuration file
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("universalsub")
        .join("config.json")
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.target_language.trim().is_empty() {
            return Err(anyhow!("Target language cannot be empty"));
        }

        if self.translation.batch_size == 0 {
            return Err(anyhow!("Translation batch_size must be greater than 0"));
        }

        if !(0.0..=2.0).contains(&self.translation.temperature) {
            return Err(anyhow!(
                "Translation temperature must be between 0.0 and 2.0, got {}",
                self.translation.temperature
            ));
        }

        Url::parse(&self.translation.base_url)
            .with_context(|| format!("Invalid translation base_url: {}", self.translation.base_url))?;

        if self.transcription.binary.trim().is_empty() {
            return Err(anyhow!("Transcription binary cannot be empty"));
        }

        Ok(())
    }

    /// Load the configuration from a JSON file, writing a default one when it does not exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            return Ok(config);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Save the configuration as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        crate::file_utils::FileManager::write_to_file(path, &config_json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))
    }

    /// Capture the values a task reads for its whole lifetime
    pub fn task_settings(&self) -> TaskSettings {
        TaskSettings {
            batch_size: self.translation.batch_size.max(1),
            system_prompt: self.translation.system_prompt.clone(),
            fallback_prompt: self.translation.fallback_prompt.clone(),
        }
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            target_language: default_target_language(),
            translation: TranslationConfig::default(),
            transcription: TranscriptionConfig::default(),
            media: MediaConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

/// Read-only configuration values captured when a task is submitted
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSettings {
    pub batch_size: usize,
    pub system_prompt: String,
    pub fallback_prompt: String,
}

impl Default for TaskSettings {
    fn default() -> Self {
        Config::default().task_settings()
    }
}

/// Shared handle to the live configuration.
///
/// The UI side updates it through `update`; a running task only ever sees the
/// `TaskSettings` snapshot taken at submit time.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig {
    inner: Arc<RwLock<Config>>,
}

impl SharedConfig {
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Clone of the current configuration
    pub fn snapshot(&self) -> Config {
        self.inner.read().clone()
    }

    pub fn task_settings(&self) -> TaskSettings {
        self.inner.read().task_settings()
    }

    /// Apply an update in place
    pub fn update<F: FnOnce(&mut Config)>(&self, f: F) {
        let mut guard = self.inner.write();
        f(&mut *guard);
    }
}
