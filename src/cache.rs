//! Agent response cache
//!
//! Content-addressed store for expert persona outputs, keyed on the agent
//! identity and the normalized turn text. Entries expire after a TTL and an
//! expired entry is indistinguishable from an absent one. The cache is
//! advisory: every caller must behave correctly against an always-empty
//! cache, it only saves provider latency and quota on repeated briefs.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::agents::AgentId;

/// Inputs longer than this are truncated before keying, so trailing noise
/// in a long brief does not defeat the cache.
const KEY_INPUT_MAX_LEN: usize = 200;

struct CacheEntry {
    response: String,
    created: Instant,
    agent: AgentId,
}

pub struct AgentCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl AgentCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn key(agent: AgentId, input: &str) -> String {
        let normalized: String = input
            .trim()
            .to_lowercase()
            .chars()
            .take(KEY_INPUT_MAX_LEN)
            .collect();
        let mut hasher = Sha256::new();
        hasher.update(agent.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(normalized.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Returns the stored response when a live entry exists, else `None`.
    pub fn get(&self, agent: AgentId, input: &str) -> Option<String> {
        let key = Self::key(agent, input);
        let entries = self.entries.read().ok()?;
        let entry = entries.get(&key)?;
        if entry.created.elapsed() < self.ttl {
            debug!(agent = %entry.agent, "agent cache hit");
            Some(entry.response.clone())
        } else {
            None
        }
    }

    /// Unconditionally (over)writes the entry. Last writer wins.
    pub fn put(&self, agent: AgentId, input: &str, response: &str) {
        let key = Self::key(agent, input);
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                key,
                CacheEntry {
                    response: response.to_string(),
                    created: Instant::now(),
                    agent,
                },
            );
        }
    }

    /// Drops expired entries. Called opportunistically, not required for
    /// correctness since `get` re-checks the TTL.
    pub fn evict_expired(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|_, e| e.created.elapsed() < self.ttl);
        }
    }

    #[cfg(test)]
    fn backdate(&self, agent: AgentId, input: &str, age: Duration) {
        let key = Self::key(agent, input);
        if let Ok(mut entries) = self.entries.write() {
            if let Some(entry) = entries.get_mut(&key) {
                entry.created = Instant::now() - age;
            }
        }
    }
}
