//! Assistant configuration.
//!
//! Loaded via the `config` crate from environment variables prefixed with
//! `CHAINLAB_`, using `__` between nested keys:
//!
//! ```text
//! CHAINLAB_MODEL__ID=us.amazon.nova-lite-v1:0
//! CHAINLAB_MODEL__TEMPERATURE=0.7
//! CHAINLAB_DEFAULT_SESSION=default
//! CHAINLAB_MARKER_POLICY=first_pair
//! ```

use chainlab_conversation::MarkerPolicy;
use serde::Deserialize;

/// Top-level assistant configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AssistantConfig {
    /// Model selection and sampling settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Session used when the caller does not name one.
    #[serde(default = "default_session")]
    pub default_session: String,

    /// How repeated `TOOL:`/`INPUT:` markers resolve.
    #[serde(default)]
    pub marker_policy: MarkerPolicy,

    /// Whether the built-in tools are offered to the model.
    #[serde(default = "default_tools_enabled")]
    pub tools_enabled: bool,
}

/// Model-related configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelConfig {
    /// Provider model identifier.
    #[serde(default = "default_model_id")]
    pub id: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_session() -> String {
    "default".to_string()
}

fn default_tools_enabled() -> bool {
    true
}

fn default_model_id() -> String {
    "us.amazon.nova-lite-v1:0".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2000
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            id: default_model_id(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            default_session: default_session(),
            marker_policy: MarkerPolicy::default(),
            tools_enabled: default_tools_enabled(),
        }
    }
}

impl AssistantConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_source(
            config::Environment::with_prefix("CHAINLAB")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
    }

    /// Loads configuration from an arbitrary `config` source.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or deserialized.
    pub fn from_source<S>(source: S) -> Result<Self, config::ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }
}
