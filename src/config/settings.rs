//! Runtime settings for the router and its worker pool.
//!
//! Settings are read from a TOML file (every field has a default, so an empty
//! file is valid), then selectively overridden from the environment:
//!
//! ```toml
//! container_id = "orders_1.0.0"
//! page_size = 100
//! request_timeout_ms = 30000
//! workers = 4
//!
//! [routing]
//! orderCompleted = "billing-process"
//! ```
//!
//! | Variable | Field |
//! |----------|-------|
//! | `ROUTER_CONTAINER_ID` | `container_id` |
//! | `ROUTER_PAGE_SIZE` | `page_size` |
//! | `ROUTER_MAX_PAGES` | `max_pages` |
//! | `ROUTER_REQUEST_TIMEOUT_MS` | `request_timeout_ms` |
//! | `ROUTER_WORKERS` | `workers` |
//! | `ROUTER_QUEUE_CAPACITY` | `queue_capacity` |

use super::overrides::{ConfigSource, EnvSource, LayeredSource, MapSource, PRECISE_PREFIX};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterSettings {
    /// Engine deployment unit that owns the process definitions.
    pub container_id: String,

    /// Page size used for catalog reads.
    pub page_size: u32,

    /// Upper bound on pages read per catalog query; `None` reads until a short page.
    pub max_pages: Option<u32>,

    /// Per-call engine timeout applied by [`EngineHandle`](crate::engine::EngineHandle).
    pub request_timeout_ms: u64,

    /// Number of concurrent message workers.
    pub workers: usize,

    /// Capacity of the inbound message queue.
    pub queue_capacity: usize,

    /// Message name → process id overrides.
    pub routing: BTreeMap<String, String>,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            container_id: "default".to_string(),
            page_size: 100,
            max_pages: None,
            request_timeout_ms: 30_000,
            workers: 4,
            queue_capacity: 64,
            routing: BTreeMap::new(),
        }
    }
}

impl RouterSettings {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(input)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Loads from `path` when given, otherwise starts from defaults, then
    /// applies the process environment.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let settings = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        settings.apply_env(&EnvSource)
    }

    /// Overrides fields from `ROUTER_*` keys in `source`, then re-validates.
    pub fn apply_env(mut self, source: &dyn ConfigSource) -> Result<Self, ConfigError> {
        if let Some(container) = source.get("ROUTER_CONTAINER_ID") {
            self.container_id = container.trim().to_string();
        }
        if let Some(v) = parse_var(source, "ROUTER_PAGE_SIZE")? {
            self.page_size = v;
        }
        if let Some(v) = parse_var(source, "ROUTER_MAX_PAGES")? {
            self.max_pages = Some(v);
        }
        if let Some(v) = parse_var(source, "ROUTER_REQUEST_TIMEOUT_MS")? {
            self.request_timeout_ms = v;
        }
        if let Some(v) = parse_var(source, "ROUTER_WORKERS")? {
            self.workers = v;
        }
        if let Some(v) = parse_var(source, "ROUTER_QUEUE_CAPACITY")? {
            self.queue_capacity = v;
        }
        self.validate()?;
        Ok(self)
    }

    /// Checks value ranges, reporting every problem at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();
        if self.container_id.trim().is_empty() {
            problems.push("container_id must not be empty".to_string());
        }
        if self.page_size == 0 {
            problems.push("page_size must be greater than 0".to_string());
        }
        if self.max_pages == Some(0) {
            problems.push("max_pages must be greater than 0 when set".to_string());
        }
        if self.request_timeout_ms == 0 {
            problems.push("request_timeout_ms must be greater than 0".to_string());
        }
        if self.workers == 0 {
            problems.push("workers must be greater than 0".to_string());
        }
        if self.queue_capacity == 0 {
            problems.push("queue_capacity must be greater than 0".to_string());
        }
        for (message, process) in &self.routing {
            if process.trim().is_empty() {
                problems.push(format!("routing.{message} must name a process"));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems.join(", ")))
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// The `[routing]` table as precise override keys, layered over the
    /// process environment.
    pub fn override_source(&self) -> LayeredSource {
        let table: MapSource = self
            .routing
            .iter()
            .map(|(message, process)| (format!("{PRECISE_PREFIX}{message}"), process.clone()))
            .collect();
        LayeredSource::new().push(table).push(EnvSource)
    }
}

fn parse_var<T: FromStr>(source: &dyn ConfigSource, key: &str) -> Result<Option<T>, ConfigError> {
    match source.get(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(format!("{key} has an invalid value '{raw}'"))),
    }
}
