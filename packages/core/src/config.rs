//! Configuration for connection synchronization
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable overriding the mention sigil
pub const ENV_MENTION_SIGIL: &str = "NOTELINK_MENTION_SIGIL";
/// Environment variable overriding the mention type marker
pub const ENV_MENTION_MARKER: &str = "NOTELINK_MENTION_MARKER";
/// Environment variable setting the cache TTL in seconds (0 disables TTL)
pub const ENV_CACHE_TTL_SECS: &str = "NOTELINK_CACHE_TTL_SECS";

/// How mention elements are recognised in serialized editor content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParserConfig {
    /// Leading display character stripped from mention text (e.g. `@`)
    pub sigil: char,

    /// Value of the `data-type` attribute flagging an element as a mention
    pub marker: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            sigil: '@',
            marker: "mention".to_string(),
        }
    }
}

/// Top-level configuration for the sync engine and its caches
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    #[serde(default)]
    pub parser: ParserConfig,

    /// Optional time-based staleness for cached connection lists.
    /// `None` means entries only go stale through explicit invalidation.
    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,
}

impl SyncConfig {
    /// Build a config from defaults overridden by `NOTELINK_*` environment variables
    ///
    /// Unparseable values are ignored with a warning rather than failing startup.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(sigil) = lookup(ENV_MENTION_SIGIL) {
            let mut chars = sigil.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => config.parser.sigil = c,
                _ => tracing::warn!(
                    "Ignoring {}={:?}: expected a single character",
                    ENV_MENTION_SIGIL,
                    sigil
                ),
            }
        }

        if let Some(marker) = lookup(ENV_MENTION_MARKER) {
            config.parser.marker = marker;
        }

        if let Some(ttl) = lookup(ENV_CACHE_TTL_SECS) {
            match ttl.parse::<u64>() {
                Ok(0) => config.cache_ttl_secs = None,
                Ok(secs) => config.cache_ttl_secs = Some(secs),
                Err(e) => tracing::warn!("Ignoring {}={:?}: {}", ENV_CACHE_TTL_SECS, ttl, e),
            }
        }

        config
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_secs.map(Duration::from_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.parser.marker.trim().is_empty() {
            return Err("parser.marker cannot be empty".to_string());
        }

        if self.parser.sigil.is_whitespace() {
            return Err("parser.sigil cannot be whitespace".to_string());
        }

        if self.cache_ttl_secs == Some(0) {
            return Err("cacheTtlSecs must be greater than 0 when set".to_string());
        }

        Ok(())
    }
}
