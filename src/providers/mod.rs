//! Provider implementations and the interface they share

pub mod groq;
pub mod ollama;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Reachability report for one provider slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderHealth
{   pub role: crate::ProviderRole
  , pub reachable: bool
  , pub model: String
  , /// Human-readable detail when unreachable
    pub detail: Option<String>
}

/// One blocking inference call, text in, text out.
///
/// Implementations never retry internally; retry and failover
/// policy lives entirely in the orchestrator so providers stay
/// simple and swappable. Every failure path maps into
/// `ProviderError` tagged with this provider's role.
#[async_trait]
pub trait InferenceProvider: Send + Sync
{   /// Which slot this provider fills
    fn role(&self) -> crate::ProviderRole;

    /// Model identifier, for health reports and logs
    fn model(&self) -> &str;

    /// Issue the prompt and return the raw response text,
    /// bounded by the timeout in `options`.
    async fn call(
      &self
    , prompt: &str
    , options: &crate::config::ProviderCallOptions
    ) -> Result<String, crate::error::ProviderError>;

    /// Cheap reachability probe; never invokes generation
    async fn health(&self) -> ProviderHealth;
}
