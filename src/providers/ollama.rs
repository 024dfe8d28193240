use serde::{Deserialize, Serialize};
use serde_json::json;
use async_trait::async_trait;
use log::{debug, trace, error, info};

// ===== Wire Types (Ollama /api/generate) =====

#[derive(Debug, Clone, Serialize)]
pub struct OllamaGenerateRequest
{   pub model: String
  , pub prompt: String
  , pub stream: bool
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>
  , pub options: serde_json::Value
}

#[derive(Debug, Clone, Deserialize)]
pub struct OllamaGenerateResponse
{   #[serde(default)]
    pub response: String
}

#[derive(Debug, Clone, Deserialize)]
pub struct OllamaTagsResponse
{   #[serde(default)]
    pub models: Vec<OllamaModelTag>
}

#[derive(Debug, Clone, Deserialize)]
pub struct OllamaModelTag
{   #[serde(default)]
    pub name: String
}

// ===== Ollama Provider (fallback slot) =====

/// Locally hosted provider. Slower than the primary but has no
/// external network dependency, so it covers the cases where
/// the primary is unreachable, unauthorized, or too slow.
pub struct OllamaProvider
{   model: String
  , base_url: String
  , http_client: reqwest::Client
}

impl OllamaProvider
{   pub fn new(
      model: String
    , base_url: String
    ) -> Self
    {   debug!(
          "Creating OllamaProvider for model: {} at {}",
          model, base_url
        );
        OllamaProvider
        {   model
          , base_url
          , http_client: reqwest::Client::new()
        }
    }

    /// Sampling options tuned for fast, deterministic JSON
    fn generation_options(
      &self
    , options: &crate::config::ProviderCallOptions
    ) -> serde_json::Value
    {   json!({
          "temperature": options.temperature,
          "num_ctx": options.context_window,
          "num_predict": options.max_tokens,
          "top_p": 0.8,
          "top_k": 20,
          "repeat_penalty": 1.1,
        })
    }

    /// Pre-load the model so the first real request is fast.
    /// Worth calling at process start when the primary is not
    /// configured and this slot will take the traffic.
    pub async fn warm_up(&self)
      -> Result<(), crate::error::ProviderError>
    {   info!("Warming up Ollama model: {}", self.model);

        let request = OllamaGenerateRequest
        {   model: self.model.clone()
          , prompt: "Hi".to_string()
          , stream: false
          , format: None
          , options: json!({ "num_predict": 1 })
        };

        self.http_client
          .post(format!("{}/api/generate", self.base_url))
          .json(&request)
          .timeout(std::time::Duration::from_secs(120))
          .send()
          .await
          .map_err(|e| {
            error!("Ollama warm-up failed: {}", e);
            crate::error::ProviderError::connection(
              crate::ProviderRole::Fallback,
              e.to_string()
            )
          })?
          .error_for_status()
          .map_err(|e| {
            error!("Ollama warm-up rejected: {}", e);
            crate::error::ProviderError::connection(
              crate::ProviderRole::Fallback,
              e.to_string()
            )
          })?;

        info!("Ollama model warmed up");
        Ok(())
    }
}

#[async_trait]
impl crate::providers::InferenceProvider for OllamaProvider
{   fn role(&self) -> crate::ProviderRole
    {   crate::ProviderRole::Fallback
    }

    fn model(&self) -> &str
    {   &self.model
    }

    async fn call(
      &self
    , prompt: &str
    , options: &crate::config::ProviderCallOptions
    ) -> Result<String, crate::error::ProviderError>
    {   debug!("Ollama call for model: {}", self.model);

        let request = OllamaGenerateRequest
        {   model: self.model.clone()
          , prompt: prompt.to_string()
          , stream: false
          , format: options.json_mode
              .then(|| "json".to_string())
          , options: self.generation_options(options)
        };

        trace!("Ollama request: {:?}", request);

        let response = self.http_client
          .post(format!("{}/api/generate", self.base_url))
          .json(&request)
          .timeout(options.timeout())
          .send()
          .await
          .map_err(|e| {
            if e.is_timeout()
            {   error!("Ollama request timed out");
                crate::error::ProviderError::timeout(
                  crate::ProviderRole::Fallback
                )
            } else
            {   error!("Ollama request failed: {}", e);
                crate::error::ProviderError::connection(
                  crate::ProviderRole::Fallback,
                  e.to_string()
                )
            }
          })?;

        let status = response.status();
        trace!("Ollama response status: {}", status);

        if status.as_u16() == 429
        {   error!("Ollama rate limited");
            return Err(
              crate::error::ProviderError::rate_limited(
                crate::ProviderRole::Fallback
              )
            );
        }

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_else(|_|
                "Unknown error".to_string()
              );
            error!("Ollama API error: {}", error_text);
            return Err(
              crate::error::ProviderError::connection(
                crate::ProviderRole::Fallback,
                format!("status {}: {}", status, error_text)
              )
            );
        }

        let generate_response: OllamaGenerateResponse
          = response.json().await.map_err(|e| {
            error!("Ollama parse error: {}", e);
            crate::error::ProviderError::malformed(
              crate::ProviderRole::Fallback,
              e.to_string()
            )
          })?;

        if generate_response.response.trim().is_empty()
        {   error!("Ollama returned empty output");
            return Err(
              crate::error::ProviderError::malformed(
                crate::ProviderRole::Fallback,
                "empty output"
              )
            );
        }

        Ok(generate_response.response)
    }

    async fn health(&self) -> crate::providers::ProviderHealth
    {   debug!("Ollama health check");

        let result = self.http_client
          .get(format!("{}/api/tags", self.base_url))
          .timeout(std::time::Duration::from_secs(5))
          .send()
          .await;

        let response = match result
        {   Ok(r) if r.status().is_success() => r
          , Ok(r) => {
              return crate::providers::ProviderHealth
              {   role: crate::ProviderRole::Fallback
                , reachable: false
                , model: self.model.clone()
                , detail: Some(format!(
                    "status {}", r.status()
                  ))
              };
            }
          , Err(e) => {
              return crate::providers::ProviderHealth
              {   role: crate::ProviderRole::Fallback
                , reachable: false
                , model: self.model.clone()
                , detail: Some(e.to_string())
              };
            }
        };

        let tags: OllamaTagsResponse
          = match response.json().await
        {   Ok(t) => t
          , Err(e) => {
              return crate::providers::ProviderHealth
              {   role: crate::ProviderRole::Fallback
                , reachable: false
                , model: self.model.clone()
                , detail: Some(e.to_string())
              };
            }
        };

        let model_available = tags.models
          .iter()
          .any(|m| m.name.starts_with(&self.model));

        crate::providers::ProviderHealth
        {   role: crate::ProviderRole::Fallback
          , reachable: model_available
          , model: self.model.clone()
          , detail: if model_available
            {   None
            } else
            {   Some("model not pulled".to_string())
            }
        }
    }
}
