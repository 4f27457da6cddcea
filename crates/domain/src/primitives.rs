//! Domain primitives with validated constructors.

use javalens_shared::{ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Validation failures for domain primitives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveError {
    /// `ChunkId` is empty after trimming.
    InvalidChunkId {
        /// Length of the raw input before trimming.
        input_length: usize,
    },
    /// `CollectionName` is empty after trimming.
    EmptyCollectionName {
        /// Length of the raw input before trimming.
        input_length: usize,
    },
    /// `CollectionName` violates the allowed pattern.
    InvalidCollectionName {
        /// Trimmed collection name that failed validation.
        input: String,
    },
    /// `TenantId` is empty after trimming.
    InvalidTenantId {
        /// Length of the raw input before trimming.
        input_length: usize,
    },
    /// `DatabaseName` is empty after trimming.
    InvalidDatabaseName {
        /// Length of the raw input before trimming.
        input_length: usize,
    },
    /// Derived chunk id is invalid (invariant violation).
    DerivedChunkIdInvalid {
        /// Candidate chunk id that failed validation.
        candidate: String,
    },
}

impl PrimitiveError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidChunkId { .. } | Self::DerivedChunkIdInvalid { .. } => {
                ErrorCode::new("domain", "invalid_chunk_id")
            },
            Self::EmptyCollectionName { .. } | Self::InvalidCollectionName { .. } => {
                ErrorCode::new("domain", "invalid_collection_name")
            },
            Self::InvalidTenantId { .. } => ErrorCode::new("domain", "invalid_tenant_id"),
            Self::InvalidDatabaseName { .. } => ErrorCode::new("domain", "invalid_database_name"),
        }
    }

    const fn is_invariant(&self) -> bool {
        matches!(self, Self::DerivedChunkIdInvalid { .. })
    }
}

impl fmt::Display for PrimitiveError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidChunkId { .. } => formatter.write_str("ChunkId must be non-empty"),
            Self::EmptyCollectionName { .. } => {
                formatter.write_str("CollectionName must be non-empty")
            },
            Self::InvalidCollectionName { .. } => {
                formatter.write_str("CollectionName must match /^[a-zA-Z][a-zA-Z0-9_-]*$/")
            },
            Self::InvalidTenantId { .. } => formatter.write_str("TenantId must be non-empty"),
            Self::InvalidDatabaseName { .. } => {
                formatter.write_str("DatabaseName must be non-empty")
            },
            Self::DerivedChunkIdInvalid { .. } => {
                formatter.write_str("Derived chunk id is invalid (this is a bug).")
            },
        }
    }
}

impl std::error::Error for PrimitiveError {}

impl From<PrimitiveError> for ErrorEnvelope {
    fn from(error: PrimitiveError) -> Self {
        let mut envelope = if error.is_invariant() {
            Self::invariant(error.error_code(), error.to_string())
        } else {
            Self::expected(error.error_code(), error.to_string())
        };

        match error {
            PrimitiveError::InvalidChunkId { input_length }
            | PrimitiveError::EmptyCollectionName { input_length }
            | PrimitiveError::InvalidTenantId { input_length }
            | PrimitiveError::InvalidDatabaseName { input_length } => {
                envelope = envelope.with_metadata("input_length", input_length.to_string());
            },
            PrimitiveError::InvalidCollectionName { input } => {
                envelope = envelope.with_metadata("input", input);
            },
            PrimitiveError::DerivedChunkIdInvalid { candidate } => {
                envelope = envelope.with_metadata("candidate", candidate);
            },
        }

        envelope
    }
}

/// Identifier for a content chunk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(Box<str>);

impl ChunkId {
    /// Parse a `ChunkId` from user input.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, PrimitiveError> {
        let raw = input.as_ref();
        let Some(trimmed) = trimmed_non_empty(raw) else {
            return Err(PrimitiveError::InvalidChunkId {
                input_length: raw.len(),
            });
        };

        Ok(Self(trimmed.to_owned().into_boxed_str()))
    }

    /// Access the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the underlying string.
    #[must_use]
    pub fn into_inner(self) -> Box<str> {
        self.0
    }
}

impl AsRef<str> for ChunkId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Inputs required to derive a deterministic chunk id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkIdInput<'a> {
    /// File path relative to the repository root.
    pub relative_path: &'a str,
    /// Declaring class or interface name.
    pub class_name: &'a str,
    /// Method name, present only for method-level chunks.
    pub method_name: Option<&'a str>,
    /// Stable lowercase key for the chunk kind.
    pub kind_key: &'a str,
}

/// Derive a deterministic chunk identifier from file location and declaration names.
///
/// The id is `<dotted-path>.<class>[.<method>].<kind-key>` where the dotted path
/// is the relative file path with separators replaced by `.` and the `.java`
/// extension removed. Re-chunking an unchanged file yields identical ids.
pub fn derive_chunk_id(input: &ChunkIdInput<'_>) -> Result<ChunkId, PrimitiveError> {
    let normalized = input.relative_path.replace(['/', '\\'], ".");
    let base = normalized.strip_suffix(".java").unwrap_or(&normalized);

    let mut candidate = String::with_capacity(base.len() + 32);
    candidate.push_str(base);
    candidate.push('.');
    candidate.push_str(input.class_name);
    if let Some(method_name) = input.method_name {
        candidate.push('.');
        candidate.push_str(method_name);
    }
    candidate.push('.');
    candidate.push_str(input.kind_key);

    ChunkId::parse(candidate.as_str())
        .map_err(|_| PrimitiveError::DerivedChunkIdInvalid { candidate })
}

/// Identifier for a vector collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionName(Box<str>);

impl CollectionName {
    /// Parse a collection name that satisfies the allowlist pattern.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, PrimitiveError> {
        let raw = input.as_ref();
        let Some(trimmed) = trimmed_non_empty(raw) else {
            return Err(PrimitiveError::EmptyCollectionName {
                input_length: raw.len(),
            });
        };

        if !is_valid_collection_name(trimmed) {
            return Err(PrimitiveError::InvalidCollectionName {
                input: trimmed.to_owned(),
            });
        }

        Ok(Self(trimmed.to_owned().into_boxed_str()))
    }

    /// Access the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the underlying string.
    #[must_use]
    pub fn into_inner(self) -> Box<str> {
        self.0
    }
}

impl AsRef<str> for CollectionName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Tenant scope for the vector index service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(Box<str>);

impl TenantId {
    /// Parse a `TenantId` from user input.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, PrimitiveError> {
        let raw = input.as_ref();
        let Some(trimmed) = trimmed_non_empty(raw) else {
            return Err(PrimitiveError::InvalidTenantId {
                input_length: raw.len(),
            });
        };

        Ok(Self(trimmed.to_owned().into_boxed_str()))
    }

    /// Access the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Database scope for the vector index service (second namespace level).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatabaseName(Box<str>);

impl DatabaseName {
    /// Parse a `DatabaseName` from user input.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, PrimitiveError> {
        let raw = input.as_ref();
        let Some(trimmed) = trimmed_non_empty(raw) else {
            return Err(PrimitiveError::InvalidDatabaseName {
                input_length: raw.len(),
            });
        };

        Ok(Self(trimmed.to_owned().into_boxed_str()))
    }

    /// Access the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for DatabaseName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for DatabaseName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

fn trimmed_non_empty(input: &str) -> Option<&str> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn is_valid_collection_name(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_alphabetic() {
        return false;
    }

    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
}
