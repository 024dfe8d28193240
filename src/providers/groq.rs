use serde::{Deserialize, Serialize};
use async_trait::async_trait;
use log::{debug, trace, error};

const GROQ_API_BASE: &str
  = "https://api.groq.com/openai/v1";

const SYSTEM_PROMPT_JSON: &str
  = "You are a curriculum designer. Always respond with valid \
     JSON only, no markdown or explanation.";
const SYSTEM_PROMPT_TEXT: &str
  = "You are a curriculum designer.";

// ===== Wire Types (OpenAI-compatible chat API) =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage
{   pub role: String
  , pub content: String
}

#[derive(Debug, Clone, Serialize)]
pub struct GroqChatRequest
{   pub model: String
  , pub messages: Vec<ChatMessage>
  , pub max_tokens: usize
  , pub temperature: f32
  , pub top_p: f32
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseFormat
{   #[serde(rename = "type")]
    pub format_type: String
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroqChatResponse
{   pub choices: Vec<Choice>
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice
{   pub message: ChatMessage
  , pub finish_reason: Option<String>
}

// ===== Groq Provider (primary slot) =====

/// Hosted high-throughput provider. Fast and cheap, but needs
/// network and a configured api key; both absences surface as
/// `ConnectionFailure` so the orchestrator fails over.
pub struct GroqProvider
{   api_key: Option<String>
  , model: String
  , api_base: String
  , http_client: reqwest::Client
}

impl GroqProvider
{   pub fn new(
      api_key: Option<String>
    , model: String
    ) -> Self
    {   debug!("Creating GroqProvider for model: {}", model);
        GroqProvider
        {   api_key
          , model
          , api_base: GROQ_API_BASE.to_string()
          , http_client: reqwest::Client::new()
        }
    }

    /// Override the endpoint, for tests against a local stub
    pub fn with_api_base(mut self, base: String) -> Self
    {   self.api_base = base;
        self
    }

    pub fn is_configured(&self) -> bool
    {   self.api_key.is_some()
    }

    fn api_key(&self)
      -> Result<&str, crate::error::ProviderError>
    {   self.api_key
          .as_deref()
          .ok_or_else(|| {
            error!("GROQ_API_KEY not configured");
            crate::error::ProviderError::connection(
              crate::ProviderRole::Primary,
              "GROQ_API_KEY not configured"
            )
          })
    }

    fn map_send_error(
      &self
    , err: reqwest::Error
    ) -> crate::error::ProviderError
    {   if err.is_timeout()
        {   error!("Groq request timed out");
            crate::error::ProviderError::timeout(
              crate::ProviderRole::Primary
            )
        } else
        {   error!("Groq request failed: {}", err);
            crate::error::ProviderError::connection(
              crate::ProviderRole::Primary,
              err.to_string()
            )
        }
    }
}

#[async_trait]
impl crate::providers::InferenceProvider for GroqProvider
{   fn role(&self) -> crate::ProviderRole
    {   crate::ProviderRole::Primary
    }

    fn model(&self) -> &str
    {   &self.model
    }

    async fn call(
      &self
    , prompt: &str
    , options: &crate::config::ProviderCallOptions
    ) -> Result<String, crate::error::ProviderError>
    {   debug!("Groq call for model: {}", self.model);
        let api_key = self.api_key()?;

        let system = if options.json_mode
        {   SYSTEM_PROMPT_JSON
        } else
        {   SYSTEM_PROMPT_TEXT
        };

        let request = GroqChatRequest
        {   model: self.model.clone()
          , messages: vec![
              ChatMessage
              {   role: "system".to_string()
                , content: system.to_string()
              }
            , ChatMessage
              {   role: "user".to_string()
                , content: prompt.to_string()
              }
            ]
          , max_tokens: options.max_tokens
          , temperature: options.temperature
          , top_p: 0.8
          , response_format: options.json_mode.then(|| {
              ResponseFormat
              {   format_type: "json_object".to_string()
              }
            })
        };

        trace!("Groq request: {:?}", request);

        let response = self.http_client
          .post(format!(
            "{}/chat/completions", self.api_base
          ))
          .header("Authorization", format!("Bearer {}", api_key))
          .header("Content-Type", "application/json")
          .json(&request)
          .timeout(options.timeout())
          .send()
          .await
          .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        trace!("Groq response status: {}", status);

        if status.as_u16() == 429
        {   error!("Groq rate limited");
            return Err(
              crate::error::ProviderError::rate_limited(
                crate::ProviderRole::Primary
              )
            );
        }

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_else(|_|
                "Unknown error".to_string()
              );
            error!("Groq API error: {}", error_text);
            return Err(
              crate::error::ProviderError::connection(
                crate::ProviderRole::Primary,
                format!("status {}: {}", status, error_text)
              )
            );
        }

        let chat_response: GroqChatResponse
          = response.json().await.map_err(|e| {
            error!("Groq parse error: {}", e);
            crate::error::ProviderError::malformed(
              crate::ProviderRole::Primary,
              e.to_string()
            )
          })?;

        let content = chat_response.choices.first()
          .map(|c| c.message.content.clone())
          .ok_or_else(|| {
            error!("No choices in Groq response");
            crate::error::ProviderError::malformed(
              crate::ProviderRole::Primary,
              "no choices in response"
            )
          })?;

        if content.trim().is_empty()
        {   error!("Groq returned empty output");
            return Err(
              crate::error::ProviderError::malformed(
                crate::ProviderRole::Primary,
                "empty output"
              )
            );
        }

        Ok(content)
    }

    async fn health(&self) -> crate::providers::ProviderHealth
    {   debug!("Groq health check");
        let api_key = match &self.api_key
        {   Some(key) => key
          , None => {
              return crate::providers::ProviderHealth
              {   role: crate::ProviderRole::Primary
                , reachable: false
                , model: self.model.clone()
                , detail: Some(
                    "GROQ_API_KEY not set".to_string()
                  )
              };
            }
        };

        // Minimal probe, 5 tokens, short timeout
        let probe = GroqChatRequest
        {   model: self.model.clone()
          , messages: vec![
              ChatMessage
              {   role: "user".to_string()
                , content: "hi".to_string()
              }
            ]
          , max_tokens: 5
          , temperature: 0.0
          , top_p: 1.0
          , response_format: None
        };

        let result = self.http_client
          .post(format!(
            "{}/chat/completions", self.api_base
          ))
          .header("Authorization", format!("Bearer {}", api_key))
          .json(&probe)
          .timeout(std::time::Duration::from_secs(10))
          .send()
          .await;

        match result
        {   Ok(response) if response.status().is_success() => {
              crate::providers::ProviderHealth
              {   role: crate::ProviderRole::Primary
                , reachable: true
                , model: self.model.clone()
                , detail: None
              }
            }
          , Ok(response) => {
              crate::providers::ProviderHealth
              {   role: crate::ProviderRole::Primary
                , reachable: false
                , model: self.model.clone()
                , detail: Some(format!(
                    "status {}", response.status()
                  ))
              }
            }
          , Err(e) => {
              crate::providers::ProviderHealth
              {   role: crate::ProviderRole::Primary
                , reachable: false
                , model: self.model.clone()
                , detail: Some(e.to_string())
              }
            }
        }
    }
}
