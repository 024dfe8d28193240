//! Generation request parameters and cache fingerprinting

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use log::debug;

/// Academic level the curriculum targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum EducationLevel
{   Undergraduate
  , Postgraduate
  , Diploma
  , Custom(String)
}

impl EducationLevel
{   /// Wording substituted into prompts
    pub fn label(&self) -> &str
    {   match self
        {   EducationLevel::Undergraduate => "Undergraduate"
          , EducationLevel::Postgraduate => "Postgraduate"
          , EducationLevel::Diploma => "Diploma"
          , EducationLevel::Custom(name) => name
        }
    }
}

/// Unit the requested duration is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum DurationUnit
{   Weeks
  , Months
  , Semesters
}

/// Weekly study-hours band, rendered as "20-25" in prompts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct HoursRange
{   pub min: u8
  , pub max: u8
}

impl std::fmt::Display for HoursRange
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
      -> std::fmt::Result
    {   write!(f, "{}-{}", self.min, self.max)
    }
}

/// Immutable parameters of one generation request.
/// Derives both the prompt text and the cache fingerprint,
/// so every field participates in equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct GenerationRequest
{   /// Subject or skill to build the program around
    pub subject: String
  , pub education_level: EducationLevel
  , /// Program length, 1-8 of the chosen unit
    pub duration: u8
  , pub unit: DurationUnit
  , pub weekly_hours: HoursRange
  , /// Optional industry slant, e.g. "Healthcare"
    pub industry_focus: Option<String>
}

impl GenerationRequest
{   /// Duration converted to whole semesters. A semester is
    /// taken as 16 weeks / 4 months; partial units round up.
    pub fn semester_equivalent(&self) -> u8
    {   match self.unit
        {   DurationUnit::Semesters => self.duration
          , DurationUnit::Months => self.duration.div_ceil(4)
          , DurationUnit::Weeks => self.duration.div_ceil(16)
        }
    }

    /// Deterministic cache key for (request, kind).
    ///
    /// SHA-256 over the canonical JSON encoding; field order
    /// is fixed by the struct definition so identical field
    /// values always hash identically.
    pub fn fingerprint(
      &self
    , kind: &crate::GenerationKind
    ) -> String
    {   let normalized = serde_json::json!({
          "kind": kind,
          "request": self,
        });
        // Struct serialization order is stable, so this
        // string is canonical for equal requests.
        let encoded = normalized.to_string();

        let mut hasher = Sha256::new();
        hasher.update(encoded.as_bytes());
        let digest = hasher.finalize();

        let fingerprint = digest
          .iter()
          .map(|b| format!("{:02x}", b))
          .collect::<String>();

        debug!(
          "Fingerprint for {} request: {}",
          kind.tag(), &fingerprint[..12]
        );
        fingerprint
    }
}
