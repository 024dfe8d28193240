//! Request-level result cache with in-flight coalescing
//!
//! Maps a request fingerprint to a previously validated
//! document for the lifetime of the process. Unbounded by
//! design: no TTL and no eviction, which is a known scaling
//! limitation of the base design, not an oversight.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use log::{debug, trace};

use crate::curriculum::GeneratedDocument;

/// One cached, validated generation result
#[derive(Debug, Clone)]
pub struct CacheEntry
{   pub result: GeneratedDocument
  , pub created_at: Instant
}

/// Process-wide cache, guarded per fingerprint.
///
/// The map mutexes only protect in-memory reads and writes and
/// are never held across an await. The per-fingerprint tokio
/// mutexes from `entry_lock` are what callers hold across
/// provider I/O, so only the winner for a fingerprint performs
/// the call and unrelated fingerprints never contend.
pub struct ResultCache
{   entries: Mutex<HashMap<String, CacheEntry>>
  , locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>
}

impl ResultCache
{   pub fn new() -> Self
    {   debug!("Creating ResultCache");
        ResultCache
        {   entries: Mutex::new(HashMap::new())
          , locks: Mutex::new(HashMap::new())
        }
    }

    /// Read-only copy of the cached result, if any
    pub fn get(
      &self
    , fingerprint: &str
    ) -> Option<GeneratedDocument>
    {   let entries = self.entries
          .lock()
          .unwrap_or_else(|poisoned| poisoned.into_inner());
        let hit = entries.get(fingerprint);
        trace!(
          "Cache {} for {}",
          if hit.is_some() { "HIT" } else { "MISS" },
          &fingerprint[..fingerprint.len().min(12)]
        );
        hit.map(|entry| entry.result.clone())
    }

    pub fn put(
      &self
    , fingerprint: String
    , result: GeneratedDocument
    )
    {   debug!(
          "Caching result for {}",
          &fingerprint[..fingerprint.len().min(12)]
        );
        let mut entries = self.entries
          .lock()
          .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(
          fingerprint,
          CacheEntry
          {   result
            , created_at: Instant::now()
          }
        );
    }

    pub fn len(&self) -> usize
    {   self.entries
          .lock()
          .unwrap_or_else(|poisoned| poisoned.into_inner())
          .len()
    }

    pub fn is_empty(&self) -> bool
    {   self.len() == 0
    }

    /// Per-fingerprint mutex used by the orchestrator for
    /// in-flight coalescing. Concurrent identical requests get
    /// the same Arc; the first to lock it performs the
    /// generation, latecomers wait and then re-check the cache.
    pub fn entry_lock(
      &self
    , fingerprint: &str
    ) -> Arc<tokio::sync::Mutex<()>>
    {   let mut locks = self.locks
          .lock()
          .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks
          .entry(fingerprint.to_string())
          .or_insert_with(|| {
            Arc::new(tokio::sync::Mutex::new(()))
          })
          .clone()
    }
}

impl Default for ResultCache
{   fn default() -> Self
    {   ResultCache::new()
    }
}
