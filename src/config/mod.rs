//! Configuration: routing overrides and runtime settings.
//!
//! - [`overrides`] resolves operator-pinned message → process mappings.
//! - [`settings`] loads [`RouterSettings`] from TOML and the environment.

pub mod overrides;
pub mod settings;

pub use overrides::{
    normalize_key, ConfigSource, EnvSource, LayeredSource, MapSource, OverrideResolver,
};
pub use settings::{ConfigError, RouterSettings};
