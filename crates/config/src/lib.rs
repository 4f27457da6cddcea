//! # javalens-config
//!
//! Configuration schema, env overrides, and loading for javalens.
//!
//! Precedence is deterministic: defaults, then file content, then env
//! overrides, with validation applied to the merged result.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod env;
pub mod load;
pub mod schema;

pub use env::{AppEnv, EnvParseError, apply_env_overrides};
pub use load::{load_app_config_from_path, load_app_config_std_env, to_pretty_toml};
pub use schema::{
    AppConfig, ChunkingConfig, ConfigSchemaError, EmbeddingConfig, RetryConfig, ScanConfig,
    ValidatedAppConfig, VectorIndexConfig, parse_app_config_json, parse_app_config_toml,
};

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
