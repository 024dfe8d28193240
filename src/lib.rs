pub mod error;
pub mod config;
pub mod request;
pub mod prompt;
pub mod curriculum;
pub mod providers;
pub mod validate;
pub mod cache;
pub mod orchestrator;
use serde::{Deserialize, Serialize};

/*

currigen (Curriculum Generator) turns a short learning-goal
description into a structured multi-semester curriculum and
per-course syllabi using an LLM backend, with an automatic
fail-over from the hosted provider to a locally-running one
when the hosted api is unreachable or too slow.

currigen/
├── Cargo.toml          # Main manifest
├── src/
│   ├── lib.rs          # Re-exports and shared enums
│   ├── error.rs        # Provider/validation/pipeline errors
│   ├── config.rs       # Provider options and env configuration
│   ├── request.rs      # Generation request and fingerprinting
│   ├── prompt.rs       # Prompt templates (structure / syllabus)
│   ├── curriculum.rs   # Validated curriculum data model
│   ├── providers/      # Provider-specific implementations
│   │   ├── mod.rs      # InferenceProvider trait + health types
│   │   ├── groq.rs     # Groq cloud client (primary)
│   │   └── ollama.rs   # Local Ollama client (fallback)
│   ├── validate.rs     # Response parsing, repair, invariants
│   ├── cache.rs        # Result cache with in-flight coalescing
│   └── orchestrator.rs # Failover orchestration + health report
└── tests/              # Integration tests with mocked providers

*/

/// CURRIGEN SHARED ENUMS:

/// Which of the two provider slots raised an error or produced
/// a result. The orchestrator always tries Primary first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Hash)]
pub enum ProviderRole
{   /// Remote, high-throughput, pay-per-call provider
    Primary
  , /// Locally hosted provider, slower, no network dependency
    Fallback
}

impl std::fmt::Display for ProviderRole
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
      -> std::fmt::Result
    {   match self
        {   ProviderRole::Primary => write!(f, "primary")
          , ProviderRole::Fallback => write!(f, "fallback")
        }
    }
}

/// The two generation kinds the pipeline supports.
/// A syllabus is always generated for one named course inside
/// the program described by the request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Hash)]
pub enum GenerationKind
{   /// Whole-program curriculum outline
    Structure
  , /// Detailed teaching plan for a single course
    Syllabus
    {   course: String
    }
}

impl GenerationKind
{   /// Short tag used in fingerprints and log lines
    pub fn tag(&self) -> &'static str
    {   match self
        {   GenerationKind::Structure => "structure"
          , GenerationKind::Syllabus { .. } => "syllabus"
        }
    }
}
