//! Configuration schema, defaults, validation, and normalization.
//!
//! Deserialization uses `serde` (TOML or JSON). Validation is manual and
//! returns typed errors mapped to `ErrorEnvelope`.

use javalens_domain::ChunkingStrategy;
use javalens_shared::{ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Current supported configuration schema version.
pub const CURRENT_CONFIG_VERSION: u32 = 1;

const CHUNKING_MAX_CHARS_MIN: u32 = 100;
const CHUNKING_MAX_CHARS_MAX: u32 = 100_000;
const CHUNKING_MIN_CHARS_MIN: u32 = 1;
const CHUNKING_MIN_CHARS_MAX: u32 = 10_000;

const EMBEDDING_TIMEOUT_MIN_MS: u64 = 1_000;
const EMBEDDING_TIMEOUT_MAX_MS: u64 = 600_000;
const EMBEDDING_BATCH_SIZE_MIN: u32 = 1;
const EMBEDDING_BATCH_SIZE_MAX: u32 = 1_024;
const EMBEDDING_CONCURRENCY_MIN: u32 = 1;
const EMBEDDING_CONCURRENCY_MAX: u32 = 64;
const EMBEDDING_BATCH_DELAY_MAX_MS: u64 = 60_000;
const EMBEDDING_MAX_INPUT_CHARS_MIN: u32 = 100;
const EMBEDDING_MAX_INPUT_CHARS_MAX: u32 = 1_000_000;

const RETRY_MAX_ATTEMPTS_MIN: u32 = 1;
const RETRY_MAX_ATTEMPTS_MAX: u32 = 10;
const RETRY_BASE_DELAY_MIN_MS: u64 = 1;
const RETRY_BASE_DELAY_MAX_MS: u64 = 60_000;
const RETRY_MAX_DELAY_MAX_MS: u64 = 600_000;
const RETRY_JITTER_RATIO_PCT_MAX: u32 = 100;

const VECTOR_INDEX_TIMEOUT_MIN_MS: u64 = 1_000;
const VECTOR_INDEX_TIMEOUT_MAX_MS: u64 = 600_000;
const VECTOR_INDEX_BATCH_SIZE_MIN: u32 = 1;
const VECTOR_INDEX_BATCH_SIZE_MAX: u32 = 16_384;
const VECTOR_INDEX_BATCH_DELAY_MAX_MS: u64 = 60_000;

const SCAN_MAX_FILE_SIZE_MIN_BYTES: u64 = 1;
const SCAN_MAX_FILE_SIZE_MAX_BYTES: u64 = 100_000_000;
const SCAN_IGNORE_DIRS_MAX: usize = 128;

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct AppConfig {
    /// Schema version for forward-compatible migrations.
    pub version: u32,
    /// Chunking settings.
    pub chunking: ChunkingConfig,
    /// Embedding provider settings.
    pub embedding: EmbeddingConfig,
    /// Vector index settings.
    pub vector_index: VectorIndexConfig,
    /// Source-tree scanning settings.
    pub scan: ScanConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_CONFIG_VERSION,
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig::default(),
            vector_index: VectorIndexConfig::default(),
            scan: ScanConfig::default(),
        }
    }
}

impl AppConfig {
    /// Validate and normalize the config.
    pub fn validate_and_normalize(mut self) -> Result<ValidatedAppConfig, ConfigSchemaError> {
        self.validate_version()?;

        self.chunking.validate()?;
        self.embedding.normalize();
        self.embedding.validate()?;
        self.vector_index.normalize();
        self.vector_index.validate()?;
        self.scan.normalize_and_validate()?;

        Ok(ValidatedAppConfig { raw: self })
    }

    const fn validate_version(&self) -> Result<(), ConfigSchemaError> {
        if self.version != CURRENT_CONFIG_VERSION {
            return Err(ConfigSchemaError::UnsupportedVersion {
                found: self.version,
                supported: CURRENT_CONFIG_VERSION,
            });
        }
        Ok(())
    }
}

/// Validated config wrapper.
#[derive(Debug, Clone)]
pub struct ValidatedAppConfig {
    raw: AppConfig,
}

impl ValidatedAppConfig {
    /// Borrow the raw config.
    #[must_use]
    pub const fn as_ref(&self) -> &AppConfig {
        &self.raw
    }

    /// Consume the wrapper and return the raw config.
    #[must_use]
    pub fn into_inner(self) -> AppConfig {
        self.raw
    }
}

impl AsRef<AppConfig> for ValidatedAppConfig {
    fn as_ref(&self) -> &AppConfig {
        &self.raw
    }
}

impl std::ops::Deref for ValidatedAppConfig {
    type Target = AppConfig;

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

/// Parse an app config from a TOML string, applying validation and normalization.
pub fn parse_app_config_toml(input: &str) -> Result<ValidatedAppConfig, ErrorEnvelope> {
    let config: AppConfig = toml::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_toml"),
            format!("invalid config TOML: {error}"),
        )
    })?;

    config.validate_and_normalize().map_err(Into::into)
}

/// Parse an app config from a JSON string, applying validation and normalization.
pub fn parse_app_config_json(input: &str) -> Result<ValidatedAppConfig, ErrorEnvelope> {
    let config: AppConfig = serde_json::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_json"),
            format!("invalid config JSON: {error}"),
        )
    })?;

    config.validate_and_normalize().map_err(Into::into)
}

/// Chunking configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ChunkingConfig {
    /// Splitting strategy for oversized classes.
    pub strategy: ChunkingStrategy,
    /// Maximum characters per chunk before a class is split further.
    pub max_chunk_chars: u32,
    /// Minimum characters for a chunk to be worth emitting on its own.
    pub min_chunk_chars: u32,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            strategy: ChunkingStrategy::Adaptive,
            max_chunk_chars: 3_000,
            min_chunk_chars: 200,
        }
    }
}

impl ChunkingConfig {
    fn validate(&self) -> Result<(), ConfigSchemaError> {
        validate_limit_u32(
            "chunking",
            "maxChunkChars",
            self.max_chunk_chars,
            CHUNKING_MAX_CHARS_MIN,
            CHUNKING_MAX_CHARS_MAX,
        )?;
        validate_limit_u32(
            "chunking",
            "minChunkChars",
            self.min_chunk_chars,
            CHUNKING_MIN_CHARS_MIN,
            CHUNKING_MIN_CHARS_MAX,
        )?;
        if self.min_chunk_chars > self.max_chunk_chars {
            return Err(ConfigSchemaError::LimitOutOfRange {
                section: "chunking",
                field: "minChunkChars",
                value: u64::from(self.min_chunk_chars),
                min: u64::from(CHUNKING_MIN_CHARS_MIN),
                max: u64::from(self.max_chunk_chars),
            });
        }
        Ok(())
    }
}

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct RetryConfig {
    /// Maximum attempts (including the first attempt).
    pub max_attempts: u32,
    /// Base delay for exponential backoff (ms).
    pub base_delay_ms: u64,
    /// Maximum delay cap for backoff (ms).
    pub max_delay_ms: u64,
    /// Jitter ratio as a percentage (0..=100).
    pub jitter_ratio_pct: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            jitter_ratio_pct: 20,
        }
    }
}

impl RetryConfig {
    fn validate(&self, section: &'static str) -> Result<(), ConfigSchemaError> {
        validate_limit_u32(
            section,
            "maxAttempts",
            self.max_attempts,
            RETRY_MAX_ATTEMPTS_MIN,
            RETRY_MAX_ATTEMPTS_MAX,
        )?;
        validate_timeout_ms(
            section,
            "baseDelayMs",
            self.base_delay_ms,
            RETRY_BASE_DELAY_MIN_MS,
            RETRY_BASE_DELAY_MAX_MS,
        )?;
        validate_timeout_ms(
            section,
            "maxDelayMs",
            self.max_delay_ms,
            self.base_delay_ms,
            RETRY_MAX_DELAY_MAX_MS,
        )?;
        validate_limit_u32(
            section,
            "jitterRatioPct",
            self.jitter_ratio_pct,
            0,
            RETRY_JITTER_RATIO_PCT_MAX,
        )?;
        Ok(())
    }
}

/// Embedding provider configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct EmbeddingConfig {
    /// Base URL of the embedding HTTP endpoint.
    pub base_url: Box<str>,
    /// Embedding model name.
    pub model: Box<str>,
    /// Timeout per embedding request (ms).
    pub timeout_ms: u64,
    /// Number of texts per batch.
    pub batch_size: u32,
    /// Number of batches embedded concurrently.
    pub concurrency: u32,
    /// Pause between completed batches (ms).
    pub batch_delay_ms: u64,
    /// Maximum input characters before truncation.
    pub max_input_chars: u32,
    /// Retry policy for transient embedding failures.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "nomic-embed-text".into(),
            timeout_ms: 30_000,
            batch_size: 5,
            concurrency: 2,
            batch_delay_ms: 500,
            max_input_chars: 8_000,
            retry: RetryConfig::default(),
        }
    }
}

impl EmbeddingConfig {
    fn normalize(&mut self) {
        normalize_boxed_str(&mut self.base_url);
        normalize_boxed_str(&mut self.model);
    }

    fn validate(&self) -> Result<(), ConfigSchemaError> {
        validate_http_url("embedding", "baseUrl", &self.base_url)?;
        validate_non_empty("embedding", "model", &self.model)?;
        validate_timeout_ms(
            "embedding",
            "timeoutMs",
            self.timeout_ms,
            EMBEDDING_TIMEOUT_MIN_MS,
            EMBEDDING_TIMEOUT_MAX_MS,
        )?;
        validate_limit_u32(
            "embedding",
            "batchSize",
            self.batch_size,
            EMBEDDING_BATCH_SIZE_MIN,
            EMBEDDING_BATCH_SIZE_MAX,
        )?;
        validate_limit_u32(
            "embedding",
            "concurrency",
            self.concurrency,
            EMBEDDING_CONCURRENCY_MIN,
            EMBEDDING_CONCURRENCY_MAX,
        )?;
        validate_timeout_ms(
            "embedding",
            "batchDelayMs",
            self.batch_delay_ms,
            0,
            EMBEDDING_BATCH_DELAY_MAX_MS,
        )?;
        validate_limit_u32(
            "embedding",
            "maxInputChars",
            self.max_input_chars,
            EMBEDDING_MAX_INPUT_CHARS_MIN,
            EMBEDDING_MAX_INPUT_CHARS_MAX,
        )?;
        self.retry.validate("embedding.retry")?;
        Ok(())
    }
}

/// Vector index configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct VectorIndexConfig {
    /// Base URL of the vector index HTTP endpoint.
    pub base_url: Box<str>,
    /// Tenant scope for all collection routes.
    pub tenant: Box<str>,
    /// Database scope for all collection routes.
    pub database: Box<str>,
    /// Collection name used for code chunks.
    pub collection: Box<str>,
    /// Timeout per index request (ms).
    pub timeout_ms: u64,
    /// Number of records per add batch.
    pub batch_size: u32,
    /// Pause between add batches (ms).
    pub batch_delay_ms: u64,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            tenant: "default_tenant".into(),
            database: "default_database".into(),
            collection: "code_chunks".into(),
            timeout_ms: 10_000,
            batch_size: 50,
            batch_delay_ms: 100,
        }
    }
}

impl VectorIndexConfig {
    fn normalize(&mut self) {
        normalize_boxed_str(&mut self.base_url);
        normalize_boxed_str(&mut self.tenant);
        normalize_boxed_str(&mut self.database);
        normalize_boxed_str(&mut self.collection);
    }

    fn validate(&self) -> Result<(), ConfigSchemaError> {
        validate_http_url("vectorIndex", "baseUrl", &self.base_url)?;
        validate_non_empty("vectorIndex", "tenant", &self.tenant)?;
        validate_non_empty("vectorIndex", "database", &self.database)?;
        validate_non_empty("vectorIndex", "collection", &self.collection)?;
        validate_timeout_ms(
            "vectorIndex",
            "timeoutMs",
            self.timeout_ms,
            VECTOR_INDEX_TIMEOUT_MIN_MS,
            VECTOR_INDEX_TIMEOUT_MAX_MS,
        )?;
        validate_limit_u32(
            "vectorIndex",
            "batchSize",
            self.batch_size,
            VECTOR_INDEX_BATCH_SIZE_MIN,
            VECTOR_INDEX_BATCH_SIZE_MAX,
        )?;
        validate_timeout_ms(
            "vectorIndex",
            "batchDelayMs",
            self.batch_delay_ms,
            0,
            VECTOR_INDEX_BATCH_DELAY_MAX_MS,
        )?;
        Ok(())
    }
}

/// Source-tree scanning configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ScanConfig {
    /// Directory names skipped during the walk.
    pub ignore_dirs: Vec<Box<str>>,
    /// Maximum file size (bytes) for reading contents.
    pub max_file_size_bytes: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            ignore_dirs: default_ignore_dirs(),
            max_file_size_bytes: 2_000_000,
        }
    }
}

/// Default directory names skipped during scanning.
#[must_use]
pub fn default_ignore_dirs() -> Vec<Box<str>> {
    [".git", "target", "build", "test"]
        .into_iter()
        .map(Into::into)
        .collect()
}

impl ScanConfig {
    fn normalize_and_validate(&mut self) -> Result<(), ConfigSchemaError> {
        let mut dirs: Vec<Box<str>> = self
            .ignore_dirs
            .iter()
            .map(|entry| entry.trim())
            .filter(|entry| !entry.is_empty())
            .map(Into::into)
            .collect();
        dirs.sort_unstable();
        dirs.dedup();
        self.ignore_dirs = dirs;

        if self.ignore_dirs.len() > SCAN_IGNORE_DIRS_MAX {
            return Err(ConfigSchemaError::ListTooLarge {
                section: "scan",
                field: "ignoreDirs",
                len: self.ignore_dirs.len(),
                max: SCAN_IGNORE_DIRS_MAX,
            });
        }

        validate_limit_u64(
            "scan",
            "maxFileSizeBytes",
            self.max_file_size_bytes,
            SCAN_MAX_FILE_SIZE_MIN_BYTES,
            SCAN_MAX_FILE_SIZE_MAX_BYTES,
        )?;

        Ok(())
    }
}

/// Typed validation errors for the configuration schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSchemaError {
    /// The config version is not supported by this binary.
    UnsupportedVersion {
        /// Version found in the config.
        found: u32,
        /// Version supported by this crate.
        supported: u32,
    },
    /// A timeout or delay value is out of bounds.
    TimeoutOutOfRange {
        /// Schema section (e.g. `embedding`).
        section: &'static str,
        /// Field name in the config file (e.g. `timeoutMs`).
        field: &'static str,
        /// Value provided (ms).
        value_ms: u64,
        /// Minimum allowed value (ms).
        min_ms: u64,
        /// Maximum allowed value (ms).
        max_ms: u64,
    },
    /// A numeric limit is out of bounds.
    LimitOutOfRange {
        /// Schema section (e.g. `chunking`).
        section: &'static str,
        /// Field name in the config file (e.g. `maxChunkChars`).
        field: &'static str,
        /// Value provided.
        value: u64,
        /// Minimum allowed value.
        min: u64,
        /// Maximum allowed value.
        max: u64,
    },
    /// A list field exceeds the maximum allowed size.
    ListTooLarge {
        /// Schema section (e.g. `scan`).
        section: &'static str,
        /// Field name in the config file (e.g. `ignoreDirs`).
        field: &'static str,
        /// Number of entries after normalization/deduplication.
        len: usize,
        /// Maximum allowed number of entries.
        max: usize,
    },
    /// A required string field is empty.
    EmptyField {
        /// Schema section (e.g. `vectorIndex`).
        section: &'static str,
        /// Field name in the config file (e.g. `collection`).
        field: &'static str,
    },
    /// A URL entry is invalid.
    InvalidUrl {
        /// Schema section (e.g. `embedding`).
        section: &'static str,
        /// Field name in the config file (e.g. `baseUrl`).
        field: &'static str,
        /// Invalid URL value.
        url: String,
    },
}

impl ConfigSchemaError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedVersion { .. } => ErrorCode::new("config", "unsupported_version"),
            Self::TimeoutOutOfRange { .. } => ErrorCode::new("config", "invalid_timeout"),
            Self::LimitOutOfRange { .. } => ErrorCode::new("config", "invalid_limit"),
            Self::ListTooLarge { .. } => ErrorCode::new("config", "list_too_large"),
            Self::EmptyField { .. } => ErrorCode::new("config", "empty_field"),
            Self::InvalidUrl { .. } => ErrorCode::new("config", "invalid_url"),
        }
    }
}

impl fmt::Display for ConfigSchemaError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion { found, supported } => {
                write!(
                    formatter,
                    "unsupported config version: {found} (supported: {supported})"
                )
            },
            Self::TimeoutOutOfRange {
                section,
                field,
                value_ms,
                min_ms,
                max_ms,
            } => write!(
                formatter,
                "{section}.{field} must be within [{min_ms}, {max_ms}] ms (got {value_ms})"
            ),
            Self::LimitOutOfRange {
                section,
                field,
                value,
                min,
                max,
            } => write!(
                formatter,
                "{section}.{field} must be within [{min}, {max}] (got {value})"
            ),
            Self::ListTooLarge {
                section,
                field,
                len,
                max,
            } => write!(
                formatter,
                "{section}.{field} must have at most {max} entries (got {len})"
            ),
            Self::EmptyField { section, field } => {
                write!(formatter, "{section}.{field} must not be empty")
            },
            Self::InvalidUrl { section, field, .. } => {
                write!(formatter, "invalid URL for {section}.{field}")
            },
        }
    }
}

impl std::error::Error for ConfigSchemaError {}

impl From<ConfigSchemaError> for ErrorEnvelope {
    fn from(error: ConfigSchemaError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let mut envelope = Self::expected(code, message);

        match error {
            ConfigSchemaError::UnsupportedVersion { found, supported } => {
                envelope = envelope
                    .with_metadata("found", found.to_string())
                    .with_metadata("supported", supported.to_string());
            },
            ConfigSchemaError::TimeoutOutOfRange {
                section,
                field,
                value_ms,
                min_ms,
                max_ms,
            } => {
                envelope = envelope
                    .with_metadata("section", section)
                    .with_metadata("field", field)
                    .with_metadata("value_ms", value_ms.to_string())
                    .with_metadata("min_ms", min_ms.to_string())
                    .with_metadata("max_ms", max_ms.to_string());
            },
            ConfigSchemaError::LimitOutOfRange {
                section,
                field,
                value,
                min,
                max,
            } => {
                envelope = envelope
                    .with_metadata("section", section)
                    .with_metadata("field", field)
                    .with_metadata("value", value.to_string())
                    .with_metadata("min", min.to_string())
                    .with_metadata("max", max.to_string());
            },
            ConfigSchemaError::ListTooLarge {
                section,
                field,
                len,
                max,
            } => {
                envelope = envelope
                    .with_metadata("section", section)
                    .with_metadata("field", field)
                    .with_metadata("len", len.to_string())
                    .with_metadata("max", max.to_string());
            },
            ConfigSchemaError::EmptyField { section, field } => {
                envelope = envelope
                    .with_metadata("section", section)
                    .with_metadata("field", field);
            },
            ConfigSchemaError::InvalidUrl {
                section,
                field,
                url,
            } => {
                envelope = envelope
                    .with_metadata("section", section)
                    .with_metadata("field", field)
                    .with_metadata("url", url);
            },
        }

        envelope
    }
}

fn normalize_boxed_str(value: &mut Box<str>) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.into();
    }
}

fn validate_non_empty(
    section: &'static str,
    field: &'static str,
    value: &str,
) -> Result<(), ConfigSchemaError> {
    if value.trim().is_empty() {
        return Err(ConfigSchemaError::EmptyField { section, field });
    }
    Ok(())
}

fn validate_http_url(
    section: &'static str,
    field: &'static str,
    url: &str,
) -> Result<(), ConfigSchemaError> {
    let trimmed = url.trim();
    let valid = (trimmed.starts_with("http://") || trimmed.starts_with("https://"))
        && trimmed.len() > "https://".len();
    if !valid {
        return Err(ConfigSchemaError::InvalidUrl {
            section,
            field,
            url: url.to_string(),
        });
    }
    Ok(())
}

const fn validate_timeout_ms(
    section: &'static str,
    field: &'static str,
    value_ms: u64,
    min_ms: u64,
    max_ms: u64,
) -> Result<(), ConfigSchemaError> {
    if value_ms < min_ms || value_ms > max_ms {
        return Err(ConfigSchemaError::TimeoutOutOfRange {
            section,
            field,
            value_ms,
            min_ms,
            max_ms,
        });
    }
    Ok(())
}

const fn validate_limit_u32(
    section: &'static str,
    field: &'static str,
    value: u32,
    min: u32,
    max: u32,
) -> Result<(), ConfigSchemaError> {
    if value < min || value > max {
        return Err(ConfigSchemaError::LimitOutOfRange {
            section,
            field,
            value: value as u64,
            min: min as u64,
            max: max as u64,
        });
    }
    Ok(())
}

const fn validate_limit_u64(
    section: &'static str,
    field: &'static str,
    value: u64,
    min: u64,
    max: u64,
) -> Result<(), ConfigSchemaError> {
    if value < min || value > max {
        return Err(ConfigSchemaError::LimitOutOfRange {
            section,
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}
