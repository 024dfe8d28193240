//! Configuration for providers and pipeline behavior

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-call generation settings for one provider slot.
/// The fallback slot gets a larger timeout to compensate for
/// lower local throughput.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCallOptions
{   /// Sampling temperature, kept low for determinism
    pub temperature: f32
  , /// Cap on generated tokens
    pub max_tokens: usize
  , /// Context window requested from the model
    pub context_window: usize
  , /// Force structured JSON output
    pub json_mode: bool
  , /// Hard timeout for a single call, in seconds
    pub timeout_secs: u64
}

impl ProviderCallOptions
{   /// Defaults for the hosted primary path
    pub fn primary_default() -> Self
    {   ProviderCallOptions
        {   temperature: 0.1
          , max_tokens: 800
          , context_window: 2048
          , json_mode: true
          , timeout_secs: 20
        }
    }

    /// Defaults for the local fallback path
    pub fn fallback_default() -> Self
    {   ProviderCallOptions
        {   temperature: 0.1
          , max_tokens: 800
          , context_window: 2048
          , json_mode: true
          , timeout_secs: 45
        }
    }

    pub fn timeout(&self) -> Duration
    {   Duration::from_secs(self.timeout_secs)
    }
}

/// Pipeline configuration, normally loaded from environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig
{   /// Groq API key; absence is not a config error, the
    /// keyless primary fails fast and failover takes over
    pub groq_api_key: Option<String>
  , /// Primary model identifier
    pub groq_model: String
  , /// Ollama endpoint
    pub ollama_base_url: String
  , /// Fallback model identifier
    pub ollama_model: String
  , /// Call options for the primary slot
    pub primary: ProviderCallOptions
  , /// Call options for the fallback slot
    pub fallback: ProviderCallOptions
}

impl Default for PipelineConfig
{   fn default() -> Self
    {   PipelineConfig
        {   groq_api_key: None
          , groq_model: "llama-3.1-8b-instant".to_string()
          , ollama_base_url: "http://localhost:11434".to_string()
          , ollama_model: "qwen2.5:3b".to_string()
          , primary: ProviderCallOptions::primary_default()
          , fallback: ProviderCallOptions::fallback_default()
        }
    }
}

impl PipelineConfig
{   /// Load configuration from the process environment,
    /// falling back to the documented defaults.
    pub fn from_env() -> Self
    {   let mut config = PipelineConfig::default();

        if let Ok(key) = std::env::var("GROQ_API_KEY")
        {   if !key.is_empty()
            {   config.groq_api_key = Some(key);
            }
        }
        if let Ok(model) = std::env::var("GROQ_MODEL")
        {   config.groq_model = model;
        }
        if let Ok(url) = std::env::var("OLLAMA_BASE_URL")
        {   config.ollama_base_url = url;
        }
        if let Ok(model) = std::env::var("OLLAMA_MODEL")
        {   config.ollama_model = model;
        }
        if let Some(secs) = read_env_u64("PRIMARY_TIMEOUT_SECS")
        {   config.primary.timeout_secs = secs;
        }
        if let Some(secs) = read_env_u64("FALLBACK_TIMEOUT_SECS")
        {   config.fallback.timeout_secs = secs;
        }

        config
    }
}

fn read_env_u64(name: &str) -> Option<u64>
{   std::env::var(name)
      .ok()
      .and_then(|v| v.parse::<u64>().ok())
}
