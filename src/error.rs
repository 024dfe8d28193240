use std::fmt;

/// What went wrong inside a single provider call.
/// Implements Clone for sending through channels and for
/// carrying both halves of a double failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderErrorKind
{   /// The call exceeded its hard timeout
    Timeout
  , /// Network failure, missing credentials, or non-2xx status
    ConnectionFailure(String)
  , /// Provider returned 429
    RateLimited
  , /// Empty body, missing choices, or undecodable payload
    MalformedOutput(String)
}

/// A provider failure tagged with the slot that raised it,
/// so the orchestrator can decide failover and the reporting
/// layer can name the culprit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError
{   pub role: crate::ProviderRole
  , pub kind: ProviderErrorKind
}

impl ProviderError
{   pub fn timeout(role: crate::ProviderRole) -> Self
    {   ProviderError
        {   role
          , kind: ProviderErrorKind::Timeout
        }
    }

    pub fn connection(
      role: crate::ProviderRole
    , msg: impl Into<String>
    ) -> Self
    {   ProviderError
        {   role
          , kind: ProviderErrorKind::ConnectionFailure(msg.into())
        }
    }

    pub fn rate_limited(role: crate::ProviderRole) -> Self
    {   ProviderError
        {   role
          , kind: ProviderErrorKind::RateLimited
        }
    }

    pub fn malformed(
      role: crate::ProviderRole
    , msg: impl Into<String>
    ) -> Self
    {   ProviderError
        {   role
          , kind: ProviderErrorKind::MalformedOutput(msg.into())
        }
    }
}

impl fmt::Display for ProviderError
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match &self.kind
        {   ProviderErrorKind::Timeout => {
              write!(f, "{} provider timed out", self.role)
            }
          , ProviderErrorKind::ConnectionFailure(msg) => {
              write!(f,
                "{} provider unreachable: {}",
                self.role, msg
              )
            }
          , ProviderErrorKind::RateLimited => {
              write!(f, "{} provider rate limited", self.role)
            }
          , ProviderErrorKind::MalformedOutput(msg) => {
              write!(f,
                "{} provider returned malformed output: {}",
                self.role, msg
              )
            }
        }
    }
}

impl std::error::Error for ProviderError {}

/// Why a raw provider response could not be turned into a
/// validated document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError
{   /// Not decodable as the expected structured format
    Unparseable(String)
  , /// Decoded, but a structural invariant cannot be repaired
    SchemaViolation(String)
}

impl fmt::Display for ValidationError
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   ValidationError::Unparseable(msg) => {
              write!(f, "response is not valid JSON: {}", msg)
            }
          , ValidationError::SchemaViolation(msg) => {
              write!(f, "response violates schema: {}", msg)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Terminal pipeline failure surfaced to the caller.
/// Individual provider failures are recovered by failover and
/// never escalate on their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError
{   /// Both providers were tried and both failed
    AllProvidersFailed
    {   primary: ProviderError
      , fallback: ProviderError
    }
  , /// A provider answered but its output could not be
    /// validated or repaired
    ValidationFailed(ValidationError)
}

impl fmt::Display for PipelineError
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   PipelineError::AllProvidersFailed
            {   primary
              , fallback
            } => {
              write!(f,
                "all providers failed ({}; {})",
                primary, fallback
              )
            }
          , PipelineError::ValidationFailed(err) => {
              write!(f, "generation failed validation: {}", err)
            }
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<ValidationError> for PipelineError
{   fn from(err: ValidationError) -> Self
    {   PipelineError::ValidationFailed(err)
    }
}
