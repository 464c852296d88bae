//! Configuration for the phishguard service
//!
//! Settings load from `config/default.yaml`, an optional environment file,
//! and `PHISHGUARD__`-prefixed environment variables, in increasing
//! priority. Every field has a stated default so a bare environment works.

mod settings;

pub use settings::{
    load_settings, DetectionSettings, ObservabilitySettings, PersistenceSettings, ServerSettings,
    Settings, SttSettings,
};

use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config load error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
