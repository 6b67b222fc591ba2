//! # Routing Overrides
//!
//! Operators can pin a message name to a process definition without touching
//! the sender or the definitions. Two keys are consulted, in order:
//!
//! | Key | Example |
//! |-----|---------|
//! | `message.routing.<messageName>` | `message.routing.orderCompleted` |
//! | `MESSAGE_ROUTING_<NORMALIZED>` | `MESSAGE_ROUTING_ORDERCOMPLETED` |
//!
//! The normalized form replaces every character that is not an ASCII letter or
//! digit with `_` and upper-cases the result, which makes it usable as an
//! environment variable name.
//!
//! The resolver only reports what is configured. Whether the process id
//! actually exists is checked by the router against the live catalog.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Prefix of the precise override key.
pub const PRECISE_PREFIX: &str = "message.routing.";

/// Prefix of the normalized override key.
pub const NORMALIZED_PREFIX: &str = "MESSAGE_ROUTING_";

/// A read-only key-value lookup.
pub trait ConfigSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSource;

impl ConfigSource for EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// An in-memory map, used for config-file tables and tests.
#[derive(Debug, Clone, Default)]
pub struct MapSource {
    entries: HashMap<String, String>,
}

impl MapSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }
}

impl ConfigSource for MapSource {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }
}

impl FromIterator<(String, String)> for MapSource {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Consults several sources in order; the first hit wins.
#[derive(Clone, Default)]
pub struct LayeredSource {
    layers: Vec<Arc<dyn ConfigSource>>,
}

impl LayeredSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, source: impl ConfigSource + 'static) -> Self {
        self.layers.push(Arc::new(source));
        self
    }
}

impl ConfigSource for LayeredSource {
    fn get(&self, key: &str) -> Option<String> {
        self.layers.iter().find_map(|layer| layer.get(key))
    }
}

/// Normalizes a message name for environment-style keys.
///
/// `order-completed.v2` becomes `ORDER_COMPLETED_V2`.
pub fn normalize_key(message_name: &str) -> String {
    message_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}

/// Looks up operator-supplied message → process overrides.
#[derive(Clone)]
pub struct OverrideResolver {
    source: Arc<dyn ConfigSource>,
}

impl OverrideResolver {
    pub fn new(source: impl ConfigSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    /// A resolver that never yields an override.
    pub fn disabled() -> Self {
        Self::new(MapSource::new())
    }

    /// Returns the configured process id for `message_name`, if any.
    ///
    /// Values are trimmed and blank values are treated as unset.
    pub fn resolve(&self, message_name: &str) -> Option<String> {
        let precise = format!("{PRECISE_PREFIX}{message_name}");
        let normalized = format!("{NORMALIZED_PREFIX}{}", normalize_key(message_name));

        [precise, normalized].into_iter().find_map(|key| {
            let value = self.source.get(&key)?;
            let value = value.trim();
            if value.is_empty() {
                return None;
            }
            debug!(%key, process_id = value, "Override configured");
            Some(value.to_string())
        })
    }
}

impl std::fmt::Debug for OverrideResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverrideResolver").finish_non_exhaustive()
    }
}
