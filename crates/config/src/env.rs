//! Environment variable parsing and env-to-config merging.
//!
//! Env parsing is strict (invalid values fail fast) and deterministic (the
//! ignore-dir CSV normalizes to sorted/deduped values).

use crate::schema::{AppConfig, ValidatedAppConfig};
use javalens_domain::ChunkingStrategy;
use javalens_shared::{ErrorCode, ErrorEnvelope};
use std::collections::BTreeMap;
use std::fmt;

/// Env var: chunking strategy (`CLASS_ONLY` | `METHOD_ONLY` | `ADAPTIVE`).
pub const ENV_CHUNKING_STRATEGY: &str = "JAVALENS_CHUNKING_STRATEGY";
/// Env var: max chunk characters.
pub const ENV_CHUNKING_MAX_CHARS: &str = "JAVALENS_CHUNKING_MAX_CHARS";
/// Env var: min chunk characters.
pub const ENV_CHUNKING_MIN_CHARS: &str = "JAVALENS_CHUNKING_MIN_CHARS";

/// Env var: embedding base URL.
pub const ENV_EMBEDDING_BASE_URL: &str = "JAVALENS_EMBEDDING_BASE_URL";
/// Env var: embedding base URL (Ollama convention).
pub const ENV_EMBEDDING_BASE_URL_ALIAS: &str = "OLLAMA_HOST";
/// Env var: embedding model name.
pub const ENV_EMBEDDING_MODEL: &str = "JAVALENS_EMBEDDING_MODEL";
/// Env var: embedding model name (Ollama convention).
pub const ENV_EMBEDDING_MODEL_ALIAS: &str = "OLLAMA_MODEL";
/// Env var: embedding timeout in milliseconds.
pub const ENV_EMBEDDING_TIMEOUT_MS: &str = "JAVALENS_EMBEDDING_TIMEOUT_MS";
/// Env var: embedding batch size.
pub const ENV_EMBEDDING_BATCH_SIZE: &str = "JAVALENS_EMBEDDING_BATCH_SIZE";
/// Env var: embedding batch concurrency.
pub const ENV_EMBEDDING_CONCURRENCY: &str = "JAVALENS_EMBEDDING_CONCURRENCY";
/// Env var: pause between completed embedding batches in milliseconds.
pub const ENV_EMBEDDING_BATCH_DELAY_MS: &str = "JAVALENS_EMBEDDING_BATCH_DELAY_MS";
/// Env var: max embedding input characters before truncation.
pub const ENV_EMBEDDING_MAX_INPUT_CHARS: &str = "JAVALENS_EMBEDDING_MAX_INPUT_CHARS";
/// Env var: embedding retry max attempts.
pub const ENV_EMBEDDING_RETRY_MAX_ATTEMPTS: &str = "JAVALENS_EMBEDDING_RETRY_MAX_ATTEMPTS";
/// Env var: embedding retry base delay in milliseconds.
pub const ENV_EMBEDDING_RETRY_BASE_DELAY_MS: &str = "JAVALENS_EMBEDDING_RETRY_BASE_DELAY_MS";

/// Env var: vector index base URL.
pub const ENV_VECTOR_INDEX_BASE_URL: &str = "JAVALENS_VECTOR_INDEX_BASE_URL";
/// Env var: vector index tenant.
pub const ENV_VECTOR_INDEX_TENANT: &str = "JAVALENS_VECTOR_INDEX_TENANT";
/// Env var: vector index database.
pub const ENV_VECTOR_INDEX_DATABASE: &str = "JAVALENS_VECTOR_INDEX_DATABASE";
/// Env var: vector index collection name.
pub const ENV_VECTOR_INDEX_COLLECTION: &str = "JAVALENS_VECTOR_INDEX_COLLECTION";
/// Env var: vector index timeout in milliseconds.
pub const ENV_VECTOR_INDEX_TIMEOUT_MS: &str = "JAVALENS_VECTOR_INDEX_TIMEOUT_MS";
/// Env var: vector index add batch size.
pub const ENV_VECTOR_INDEX_BATCH_SIZE: &str = "JAVALENS_VECTOR_INDEX_BATCH_SIZE";
/// Env var: pause between add batches in milliseconds.
pub const ENV_VECTOR_INDEX_BATCH_DELAY_MS: &str = "JAVALENS_VECTOR_INDEX_BATCH_DELAY_MS";

/// Env var: scan ignore directories as CSV.
pub const ENV_SCAN_IGNORE_DIRS: &str = "JAVALENS_SCAN_IGNORE_DIRS";
/// Env var: scan max file size in bytes.
pub const ENV_SCAN_MAX_FILE_SIZE_BYTES: &str = "JAVALENS_SCAN_MAX_FILE_SIZE_BYTES";

const MAX_CSV_ITEMS: usize = 1_000;

/// Typed env-derived overrides for `AppConfig`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppEnv {
    /// Override for `chunking.strategy`.
    pub chunking_strategy: Option<ChunkingStrategy>,
    /// Override for `chunking.maxChunkChars`.
    pub chunking_max_chars: Option<u32>,
    /// Override for `chunking.minChunkChars`.
    pub chunking_min_chars: Option<u32>,

    /// Override for `embedding.baseUrl`.
    pub embedding_base_url: Option<Box<str>>,
    /// Override for `embedding.model`.
    pub embedding_model: Option<Box<str>>,
    /// Override for `embedding.timeoutMs`.
    pub embedding_timeout_ms: Option<u64>,
    /// Override for `embedding.batchSize`.
    pub embedding_batch_size: Option<u32>,
    /// Override for `embedding.concurrency`.
    pub embedding_concurrency: Option<u32>,
    /// Override for `embedding.batchDelayMs`.
    pub embedding_batch_delay_ms: Option<u64>,
    /// Override for `embedding.maxInputChars`.
    pub embedding_max_input_chars: Option<u32>,
    /// Override for `embedding.retry.maxAttempts`.
    pub embedding_retry_max_attempts: Option<u32>,
    /// Override for `embedding.retry.baseDelayMs`.
    pub embedding_retry_base_delay_ms: Option<u64>,

    /// Override for `vectorIndex.baseUrl`.
    pub vector_index_base_url: Option<Box<str>>,
    /// Override for `vectorIndex.tenant`.
    pub vector_index_tenant: Option<Box<str>>,
    /// Override for `vectorIndex.database`.
    pub vector_index_database: Option<Box<str>>,
    /// Override for `vectorIndex.collection`.
    pub vector_index_collection: Option<Box<str>>,
    /// Override for `vectorIndex.timeoutMs`.
    pub vector_index_timeout_ms: Option<u64>,
    /// Override for `vectorIndex.batchSize`.
    pub vector_index_batch_size: Option<u32>,
    /// Override for `vectorIndex.batchDelayMs`.
    pub vector_index_batch_delay_ms: Option<u64>,

    /// Override for `scan.ignoreDirs` (full replacement).
    pub scan_ignore_dirs: Option<Vec<Box<str>>>,
    /// Override for `scan.maxFileSizeBytes`.
    pub scan_max_file_size_bytes: Option<u64>,
}

impl AppEnv {
    /// Parse env overrides from a key/value map (useful for tests and fixtures).
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, EnvParseError> {
        Ok(Self {
            chunking_strategy: parse_optional_strategy(map, ENV_CHUNKING_STRATEGY)?,
            chunking_max_chars: parse_optional_u32(map, ENV_CHUNKING_MAX_CHARS)?,
            chunking_min_chars: parse_optional_u32(map, ENV_CHUNKING_MIN_CHARS)?,
            embedding_base_url: parse_optional_trimmed_any(
                map,
                &[ENV_EMBEDDING_BASE_URL, ENV_EMBEDDING_BASE_URL_ALIAS],
            )?,
            embedding_model: parse_optional_trimmed_any(
                map,
                &[ENV_EMBEDDING_MODEL, ENV_EMBEDDING_MODEL_ALIAS],
            )?,
            embedding_timeout_ms: parse_optional_u64(map, ENV_EMBEDDING_TIMEOUT_MS)?,
            embedding_batch_size: parse_optional_u32(map, ENV_EMBEDDING_BATCH_SIZE)?,
            embedding_concurrency: parse_optional_u32(map, ENV_EMBEDDING_CONCURRENCY)?,
            embedding_batch_delay_ms: parse_optional_u64(map, ENV_EMBEDDING_BATCH_DELAY_MS)?,
            embedding_max_input_chars: parse_optional_u32(map, ENV_EMBEDDING_MAX_INPUT_CHARS)?,
            embedding_retry_max_attempts: parse_optional_u32(
                map,
                ENV_EMBEDDING_RETRY_MAX_ATTEMPTS,
            )?,
            embedding_retry_base_delay_ms: parse_optional_u64(
                map,
                ENV_EMBEDDING_RETRY_BASE_DELAY_MS,
            )?,
            vector_index_base_url: parse_optional_trimmed(map, ENV_VECTOR_INDEX_BASE_URL)?,
            vector_index_tenant: parse_optional_trimmed(map, ENV_VECTOR_INDEX_TENANT)?,
            vector_index_database: parse_optional_trimmed(map, ENV_VECTOR_INDEX_DATABASE)?,
            vector_index_collection: parse_optional_trimmed(map, ENV_VECTOR_INDEX_COLLECTION)?,
            vector_index_timeout_ms: parse_optional_u64(map, ENV_VECTOR_INDEX_TIMEOUT_MS)?,
            vector_index_batch_size: parse_optional_u32(map, ENV_VECTOR_INDEX_BATCH_SIZE)?,
            vector_index_batch_delay_ms: parse_optional_u64(map, ENV_VECTOR_INDEX_BATCH_DELAY_MS)?,
            scan_ignore_dirs: parse_optional_csv(map, ENV_SCAN_IGNORE_DIRS)?,
            scan_max_file_size_bytes: parse_optional_u64(map, ENV_SCAN_MAX_FILE_SIZE_BYTES)?,
        })
    }

    /// Parse env overrides from the current process environment.
    pub fn from_std_env() -> Result<Self, EnvParseError> {
        let mut map = BTreeMap::new();
        for name in [
            ENV_CHUNKING_STRATEGY,
            ENV_CHUNKING_MAX_CHARS,
            ENV_CHUNKING_MIN_CHARS,
            ENV_EMBEDDING_BASE_URL,
            ENV_EMBEDDING_BASE_URL_ALIAS,
            ENV_EMBEDDING_MODEL,
            ENV_EMBEDDING_MODEL_ALIAS,
            ENV_EMBEDDING_TIMEOUT_MS,
            ENV_EMBEDDING_BATCH_SIZE,
            ENV_EMBEDDING_CONCURRENCY,
            ENV_EMBEDDING_BATCH_DELAY_MS,
            ENV_EMBEDDING_MAX_INPUT_CHARS,
            ENV_EMBEDDING_RETRY_MAX_ATTEMPTS,
            ENV_EMBEDDING_RETRY_BASE_DELAY_MS,
            ENV_VECTOR_INDEX_BASE_URL,
            ENV_VECTOR_INDEX_TENANT,
            ENV_VECTOR_INDEX_DATABASE,
            ENV_VECTOR_INDEX_COLLECTION,
            ENV_VECTOR_INDEX_TIMEOUT_MS,
            ENV_VECTOR_INDEX_BATCH_SIZE,
            ENV_VECTOR_INDEX_BATCH_DELAY_MS,
            ENV_SCAN_IGNORE_DIRS,
            ENV_SCAN_MAX_FILE_SIZE_BYTES,
        ] {
            if let Ok(value) = std::env::var(name) {
                map.insert(name.to_string(), value);
            }
        }

        Self::from_map(&map)
    }
}

/// Apply env overrides to a base config (env wins over file/default values).
pub fn apply_env_overrides(
    base: AppConfig,
    env: &AppEnv,
) -> Result<ValidatedAppConfig, ErrorEnvelope> {
    let mut config = base;

    if let Some(strategy) = env.chunking_strategy {
        config.chunking.strategy = strategy;
    }
    set_u32(&mut config.chunking.max_chunk_chars, env.chunking_max_chars);
    set_u32(&mut config.chunking.min_chunk_chars, env.chunking_min_chars);

    set_box_str(
        &mut config.embedding.base_url,
        env.embedding_base_url.as_deref(),
    );
    set_box_str(&mut config.embedding.model, env.embedding_model.as_deref());
    set_u64(&mut config.embedding.timeout_ms, env.embedding_timeout_ms);
    set_u32(&mut config.embedding.batch_size, env.embedding_batch_size);
    set_u32(&mut config.embedding.concurrency, env.embedding_concurrency);
    set_u64(
        &mut config.embedding.batch_delay_ms,
        env.embedding_batch_delay_ms,
    );
    set_u32(
        &mut config.embedding.max_input_chars,
        env.embedding_max_input_chars,
    );
    set_u32(
        &mut config.embedding.retry.max_attempts,
        env.embedding_retry_max_attempts,
    );
    set_u64(
        &mut config.embedding.retry.base_delay_ms,
        env.embedding_retry_base_delay_ms,
    );

    set_box_str(
        &mut config.vector_index.base_url,
        env.vector_index_base_url.as_deref(),
    );
    set_box_str(
        &mut config.vector_index.tenant,
        env.vector_index_tenant.as_deref(),
    );
    set_box_str(
        &mut config.vector_index.database,
        env.vector_index_database.as_deref(),
    );
    set_box_str(
        &mut config.vector_index.collection,
        env.vector_index_collection.as_deref(),
    );
    set_u64(
        &mut config.vector_index.timeout_ms,
        env.vector_index_timeout_ms,
    );
    set_u32(
        &mut config.vector_index.batch_size,
        env.vector_index_batch_size,
    );
    set_u64(
        &mut config.vector_index.batch_delay_ms,
        env.vector_index_batch_delay_ms,
    );

    if let Some(dirs) = env.scan_ignore_dirs.as_ref() {
        config.scan.ignore_dirs.clone_from(dirs);
    }
    set_u64(
        &mut config.scan.max_file_size_bytes,
        env.scan_max_file_size_bytes,
    );

    config.validate_and_normalize().map_err(Into::into)
}

fn set_u32(target: &mut u32, value: Option<u32>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn set_u64(target: &mut u64, value: Option<u64>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn set_box_str(target: &mut Box<str>, value: Option<&str>) {
    if let Some(value) = value {
        *target = value.into();
    }
}

/// Typed env parsing errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvParseError {
    /// A numeric env value failed to parse.
    InvalidNumber {
        /// Env var name.
        name: &'static str,
        /// Rejected value.
        value: String,
    },
    /// A chunking strategy env value failed to parse.
    InvalidStrategy {
        /// Env var name.
        name: &'static str,
        /// Rejected value.
        value: String,
    },
    /// A CSV env value has too many entries.
    CsvTooLarge {
        /// Env var name.
        name: &'static str,
        /// Number of entries found.
        len: usize,
        /// Maximum allowed entries.
        max: usize,
    },
}

impl fmt::Display for EnvParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidNumber { name, value } => {
                write!(formatter, "invalid number for {name}: {value}")
            },
            Self::InvalidStrategy { name, value } => {
                write!(formatter, "invalid chunking strategy for {name}: {value}")
            },
            Self::CsvTooLarge { name, len, max } => {
                write!(
                    formatter,
                    "{name} must have at most {max} entries (got {len})"
                )
            },
        }
    }
}

impl std::error::Error for EnvParseError {}

impl From<EnvParseError> for ErrorEnvelope {
    fn from(error: EnvParseError) -> Self {
        Self::expected(ErrorCode::new("config", "invalid_env"), error.to_string())
    }
}

fn lookup<'a>(map: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    map.get(name).map(String::as_str).map(str::trim)
}

fn parse_optional_u32(
    map: &BTreeMap<String, String>,
    name: &'static str,
) -> Result<Option<u32>, EnvParseError> {
    match lookup(map, name) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse::<u32>()
            .map(Some)
            .map_err(|_| EnvParseError::InvalidNumber {
                name,
                value: raw.to_string(),
            }),
    }
}

fn parse_optional_u64(
    map: &BTreeMap<String, String>,
    name: &'static str,
) -> Result<Option<u64>, EnvParseError> {
    match lookup(map, name) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse::<u64>()
            .map(Some)
            .map_err(|_| EnvParseError::InvalidNumber {
                name,
                value: raw.to_string(),
            }),
    }
}

fn parse_optional_trimmed(
    map: &BTreeMap<String, String>,
    name: &'static str,
) -> Result<Option<Box<str>>, EnvParseError> {
    match lookup(map, name) {
        None | Some("") => Ok(None),
        Some(raw) => Ok(Some(raw.into())),
    }
}

fn parse_optional_trimmed_any(
    map: &BTreeMap<String, String>,
    names: &[&'static str],
) -> Result<Option<Box<str>>, EnvParseError> {
    for name in names {
        if let Some(value) = parse_optional_trimmed(map, name)? {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

fn parse_optional_strategy(
    map: &BTreeMap<String, String>,
    name: &'static str,
) -> Result<Option<ChunkingStrategy>, EnvParseError> {
    match lookup(map, name) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse::<ChunkingStrategy>()
            .map(Some)
            .map_err(|_| EnvParseError::InvalidStrategy {
                name,
                value: raw.to_string(),
            }),
    }
}

fn parse_optional_csv(
    map: &BTreeMap<String, String>,
    name: &'static str,
) -> Result<Option<Vec<Box<str>>>, EnvParseError> {
    match lookup(map, name) {
        None | Some("") => Ok(None),
        Some(raw) => {
            let mut entries: Vec<Box<str>> = raw
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(Into::into)
                .collect();
            if entries.len() > MAX_CSV_ITEMS {
                return Err(EnvParseError::CsvTooLarge {
                    name,
                    len: entries.len(),
                    max: MAX_CSV_ITEMS,
                });
            }
            entries.sort_unstable();
            entries.dedup();
            Ok(Some(entries))
        },
    }
}
