//! Failover orchestration over the two provider slots

use serde::{Deserialize, Serialize};
use log::{debug, info, error};

use crate::config::{PipelineConfig, ProviderCallOptions};
use crate::curriculum::GeneratedDocument;
use crate::error::{PipelineError, ValidationError};
use crate::providers::{InferenceProvider, ProviderHealth};

/// Aggregate reachability report for the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineHealth
{   pub healthy: bool
  , pub primary: ProviderHealth
  , pub fallback: ProviderHealth
  , /// Model that would serve the next request
    pub active_engine: String
}

/// Drives one generation end to end: cache lookup, in-flight
/// coalescing, prompt build, primary call, bounded failover,
/// validation, cache store.
///
/// Failover is tried in priority order (fast hosted provider
/// first) with at most one attempt per provider, so worst-case
/// latency is bounded by the sum of the two timeouts. A caller
/// that imposes its own overall deadline can drop the
/// `generate` future; the in-flight marker is released with it
/// so coalesced waiters are never stranded.
pub struct GenerationOrchestrator
{   primary: Box<dyn InferenceProvider>
  , fallback: Box<dyn InferenceProvider>
  , primary_options: ProviderCallOptions
  , fallback_options: ProviderCallOptions
  , cache: crate::cache::ResultCache
}

impl GenerationOrchestrator
{   pub fn new(
      primary: Box<dyn InferenceProvider>
    , fallback: Box<dyn InferenceProvider>
    , primary_options: ProviderCallOptions
    , fallback_options: ProviderCallOptions
    ) -> Self
    {   debug!("Creating GenerationOrchestrator");
        GenerationOrchestrator
        {   primary
          , fallback
          , primary_options
          , fallback_options
          , cache: crate::cache::ResultCache::new()
        }
    }

    /// Wire up the real Groq + Ollama pair from configuration
    pub fn from_config(config: PipelineConfig) -> Self
    {   let primary
          = crate::providers::groq::GroqProvider::new(
              config.groq_api_key.clone(),
              config.groq_model.clone()
            );
        let fallback
          = crate::providers::ollama::OllamaProvider::new(
              config.ollama_model.clone(),
              config.ollama_base_url.clone()
            );
        GenerationOrchestrator::new(
          Box::new(primary),
          Box::new(fallback),
          config.primary,
          config.fallback
        )
    }

    pub fn cache(&self) -> &crate::cache::ResultCache
    {   &self.cache
    }

    /// Generate one validated document for (request, kind).
    ///
    /// Within a fingerprint, generation happens at most once:
    /// concurrent identical requests coalesce onto the first
    /// caller's provider call and all observe its result.
    pub async fn generate(
      &self
    , request: &crate::request::GenerationRequest
    , kind: &crate::GenerationKind
    ) -> Result<GeneratedDocument, PipelineError>
    {   let fingerprint = request.fingerprint(kind);

        if let Some(document) = self.cache.get(&fingerprint)
        {   info!(
              "Cache hit for {} request", kind.tag()
            );
            return Ok(document);
        }

        let in_flight = self.cache.entry_lock(&fingerprint);
        let _guard = in_flight.lock().await;

        // A coalesced waiter reaches here after the winner
        // finished; re-check before issuing any call
        if let Some(document) = self.cache.get(&fingerprint)
        {   debug!("Coalesced waiter served from cache");
            return Ok(document);
        }

        let prompt
          = crate::prompt::PromptBuilder::build(request, kind);
        debug!(
          "Generating {} ({} prompt words)",
          kind.tag(),
          crate::prompt::PromptBuilder::word_count(&prompt)
        );

        let document
          = self.run_providers(&prompt, request, kind).await?;

        self.cache.put(fingerprint, document.clone());
        Ok(document)
    }

    /// Primary first, then exactly one failover hop
    async fn run_providers(
      &self
    , prompt: &str
    , request: &crate::request::GenerationRequest
    , kind: &crate::GenerationKind
    ) -> Result<GeneratedDocument, PipelineError>
    {   let primary_raw = self.primary
          .call(prompt, &self.primary_options)
          .await;

        match primary_raw
        {   Ok(raw) => {
              match self.validate_raw(&raw, request, kind)
              {   Ok(document) => Ok(document)
                , Err(validation_err) => {
                    // Not retried against the same provider,
                    // but the fallback has not been tried yet
                    error!(
                      "Primary output failed validation: {}. \
                       Retrying once against fallback",
                      validation_err
                    );
                    self.validation_retry(
                      prompt, request, kind, validation_err
                    ).await
                  }
              }
            }
          , Err(primary_err) => {
              info!(
                "Primary failed ({}). Failing over", primary_err
              );
              let fallback_raw = self.fallback
                .call(prompt, &self.fallback_options)
                .await;
              match fallback_raw
              {   Ok(raw) => {
                    // Both providers are spent; a validation
                    // failure here is terminal
                    self.validate_raw(&raw, request, kind)
                      .map_err(PipelineError::from)
                  }
                , Err(fallback_err) => {
                    error!(
                      "All providers failed: {}; {}",
                      primary_err, fallback_err
                    );
                    Err(PipelineError::AllProvidersFailed
                    {   primary: primary_err
                      , fallback: fallback_err
                    })
                  }
              }
            }
        }
    }

    /// One shot at the fallback after the primary produced
    /// output that would not validate. If the fallback cannot
    /// answer, the original validation failure is what the
    /// caller learns about.
    async fn validation_retry(
      &self
    , prompt: &str
    , request: &crate::request::GenerationRequest
    , kind: &crate::GenerationKind
    , original: ValidationError
    ) -> Result<GeneratedDocument, PipelineError>
    {   let fallback_raw = self.fallback
          .call(prompt, &self.fallback_options)
          .await;

        match fallback_raw
        {   Ok(raw) => {
              self.validate_raw(&raw, request, kind)
                .map_err(PipelineError::from)
            }
          , Err(provider_err) => {
              error!(
                "Fallback unavailable for validation retry: {}",
                provider_err
              );
              Err(PipelineError::ValidationFailed(original))
            }
        }
    }

    fn validate_raw(
      &self
    , raw: &str
    , request: &crate::request::GenerationRequest
    , kind: &crate::GenerationKind
    ) -> Result<GeneratedDocument, ValidationError>
    {   match kind
        {   crate::GenerationKind::Structure => {
              let repaired
                = crate::validate::validate_structure(
                    raw, request
                  )?;
              if !repaired.is_exact()
              {   debug!(
                    "Structure repaired: {:?}",
                    repaired.repairs
                  );
              }
              Ok(GeneratedDocument::Structure(repaired.value))
            }
          , crate::GenerationKind::Syllabus { course } => {
              let repaired
                = crate::validate::validate_syllabus(
                    raw, course, &request.subject
                  )?;
              if !repaired.is_exact()
              {   debug!(
                    "Syllabus repaired: {:?}",
                    repaired.repairs
                  );
              }
              Ok(GeneratedDocument::Syllabus(repaired.value))
            }
        }
    }

    /// Reachability of both providers, without invoking
    /// generation. Healthy when either slot can serve.
    pub async fn health(&self) -> PipelineHealth
    {   debug!("Pipeline health check");
        let primary = self.primary.health().await;
        let fallback = self.fallback.health().await;

        let active_engine = if primary.reachable
        {   self.primary.model().to_string()
        } else
        {   self.fallback.model().to_string()
        };

        PipelineHealth
        {   healthy: primary.reachable || fallback.reachable
          , primary
          , fallback
          , active_engine
        }
    }
}
