//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// STT backend configuration
    #[serde(default)]
    pub stt: SttSettings,

    /// Detection tuning
    #[serde(default)]
    pub detection: DetectionSettings,

    /// Call-log persistence
    #[serde(default)]
    pub persistence: PersistenceSettings,

    /// Logging configuration
    #[serde(default)]
    pub observability: ObservabilitySettings,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.detection.window_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "detection.window_size".to_string(),
                message: "window size must be at least 1".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.detection.comprehensive_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "detection.comprehensive_threshold".to_string(),
                message: "threshold must be within 0.0 - 1.0".to_string(),
            });
        }

        if !(8000..=48000).contains(&self.stt.sample_rate) {
            return Err(ConfigError::InvalidValue {
                field: "stt.sample_rate".to_string(),
                message: "sample rate must be within 8000 - 48000 Hz".to_string(),
            });
        }

        if self.stt.provider != "grpc" && self.stt.provider != "ws" {
            return Err(ConfigError::InvalidValue {
                field: "stt.provider".to_string(),
                message: format!("unknown provider {:?}", self.stt.provider),
            });
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Enable permissive CORS (development convenience)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Public websocket base advertised by `/api/transcribe/ws-info`
    #[serde(default = "default_public_ws_base")]
    pub public_ws_base: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_public_ws_base() -> String {
    "ws://127.0.0.1:8000".to_string()
}
fn default_true() -> bool {
    true
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: default_true(),
            public_ws_base: default_public_ws_base(),
        }
    }
}

/// STT backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttSettings {
    /// Backend selector: "grpc" or "ws"
    #[serde(default = "default_stt_provider")]
    pub provider: String,

    /// gRPC recognizer endpoint
    #[serde(default = "default_grpc_endpoint")]
    pub grpc_endpoint: String,

    /// WebSocket provider URL
    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    /// Default audio sample rate in Hz
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Default recognition language
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_stt_provider() -> String {
    "grpc".to_string()
}
fn default_grpc_endpoint() -> String {
    "http://127.0.0.1:50051".to_string()
}
fn default_ws_url() -> String {
    "wss://stt.example.com/stream".to_string()
}
fn default_sample_rate() -> u32 {
    16000
}
fn default_language() -> String {
    "ko-KR".to_string()
}

impl Default for SttSettings {
    fn default() -> Self {
        Self {
            provider: default_stt_provider(),
            grpc_endpoint: default_grpc_endpoint(),
            ws_url: default_ws_url(),
            sample_rate: default_sample_rate(),
            language: default_language(),
        }
    }
}

/// Detection tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionSettings {
    /// Recent-sentence window size
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Multiplier on risky-chunk score growth
    #[serde(default = "default_risk_gain")]
    pub risk_gain: f32,

    /// Flat cumulative-score decay on safe chunks
    #[serde(default = "default_safe_decay")]
    pub safe_decay: f32,

    /// Enable forced finalization for backends without a final flag
    #[serde(default = "default_true")]
    pub force_finalize: bool,

    /// Minimum pending length (chars) before forced finalization
    #[serde(default = "default_min_chars_force_final")]
    pub min_chars_force_final: usize,

    /// Minimum accumulated length (chars) for comprehensive analysis
    #[serde(default = "default_min_chars_comprehensive")]
    pub min_chars_comprehensive: usize,

    /// Minimum finalized-sentence count for comprehensive analysis
    #[serde(default = "default_min_sentences_comprehensive")]
    pub min_sentences_comprehensive: usize,

    /// Comprehensive-classifier decision threshold
    #[serde(default = "default_comprehensive_threshold")]
    pub comprehensive_threshold: f32,

    /// Minimum chunk length (chars) for immediate analysis
    #[serde(default = "default_min_chars_immediate")]
    pub min_chars_immediate: usize,

    /// Lexicon weights above this count toward the immediate score
    #[serde(default = "default_weight_threshold")]
    pub weight_threshold: f32,

    /// Keyword-weight CSV path (`word,weight`)
    #[serde(default = "default_keyword_lexicon_path")]
    pub keyword_lexicon_path: String,

    /// Category-weight CSV path (`word,category,weight`)
    #[serde(default = "default_category_lexicon_path")]
    pub category_lexicon_path: String,
}

fn default_window_size() -> usize {
    5
}
fn default_risk_gain() -> f32 {
    1.0
}
fn default_safe_decay() -> f32 {
    1.5
}
fn default_min_chars_force_final() -> usize {
    6
}
fn default_min_chars_comprehensive() -> usize {
    6
}
fn default_min_sentences_comprehensive() -> usize {
    1
}
fn default_comprehensive_threshold() -> f32 {
    0.35
}
fn default_min_chars_immediate() -> usize {
    3
}
fn default_weight_threshold() -> f32 {
    1.3
}
fn default_keyword_lexicon_path() -> String {
    "data/lexicon/keyword_weights.csv".to_string()
}
fn default_category_lexicon_path() -> String {
    "data/lexicon/category_weights.csv".to_string()
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            risk_gain: default_risk_gain(),
            safe_decay: default_safe_decay(),
            force_finalize: default_true(),
            min_chars_force_final: default_min_chars_force_final(),
            min_chars_comprehensive: default_min_chars_comprehensive(),
            min_sentences_comprehensive: default_min_sentences_comprehensive(),
            comprehensive_threshold: default_comprehensive_threshold(),
            min_chars_immediate: default_min_chars_immediate(),
            weight_threshold: default_weight_threshold(),
            keyword_lexicon_path: default_keyword_lexicon_path(),
            category_lexicon_path: default_category_lexicon_path(),
        }
    }
}

/// Call-log persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceSettings {
    /// JSONL call-log path
    #[serde(default = "default_call_log_path")]
    pub call_log_path: String,
}

fn default_call_log_path() -> String {
    "data/call_logs.jsonl".to_string()
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            call_log_path: default_call_log_path(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilitySettings {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON logs
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (PHISHGUARD prefix, `__` separator)
/// 2. config/{env}.yaml (if env specified)
/// 3. config/default.yaml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder = builder.add_source(File::with_name(&format!("config/{env_name}")).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("PHISHGUARD")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}
