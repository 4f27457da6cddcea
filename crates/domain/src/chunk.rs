//! Chunk records produced by the chunker.

use crate::primitives::ChunkId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// String-keyed, string-valued metadata attached to chunks and embeddings.
///
/// Values are always strings because the vector index only accepts flat
/// string metadata.
pub type ChunkMetadata = BTreeMap<String, String>;

/// Named method buckets used when an oversized class is split adaptively.
///
/// Variants are listed in emission priority order: endpoints and business
/// rules have the highest retrieval value, accessors the lowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MethodGroupKind {
    /// Methods carrying a web-route annotation.
    RestEndpoints,
    /// Everything not matched by another rule.
    BusinessLogic,
    /// Methods whose name suggests persistence operations.
    CrudOperations,
    /// Getters, setters, and `is*` predicates.
    Accessors,
}

impl MethodGroupKind {
    /// All groups in emission priority order.
    pub const ALL: [Self; 4] = [
        Self::RestEndpoints,
        Self::BusinessLogic,
        Self::CrudOperations,
        Self::Accessors,
    ];

    /// Canonical chunk-type tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RestEndpoints => "REST_ENDPOINTS",
            Self::BusinessLogic => "BUSINESS_LOGIC",
            Self::CrudOperations => "CRUD_OPERATIONS",
            Self::Accessors => "ACCESSORS",
        }
    }

    /// Lowercase key used in derived chunk ids.
    #[must_use]
    pub const fn id_key(self) -> &'static str {
        match self {
            Self::RestEndpoints => "rest_endpoints",
            Self::BusinessLogic => "business_logic",
            Self::CrudOperations => "crud_operations",
            Self::Accessors => "accessors",
        }
    }
}

impl fmt::Display for MethodGroupKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Kind tag carried by every chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChunkKind {
    /// Whole class body (small classes or `CLASS_ONLY` strategy).
    Class,
    /// Whole interface body.
    Interface,
    /// One method with class/package context.
    Method,
    /// Synthetic class overview: signature, annotations, method signatures.
    ClassMetadata,
    /// All field declarations of one class.
    Fields,
    /// One method group of an adaptively split class.
    Group(MethodGroupKind),
}

impl ChunkKind {
    /// Canonical chunk-type tag, stored in metadata and shown to callers.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Class => "CLASS",
            Self::Interface => "INTERFACE",
            Self::Method => "METHOD",
            Self::ClassMetadata => "CLASS_METADATA",
            Self::Fields => "FIELDS",
            Self::Group(group) => group.as_str(),
        }
    }

    /// Lowercase key used in derived chunk ids.
    ///
    /// Class and interface chunks share the `class` key; the tag still
    /// distinguishes them, and a file never yields both for one type.
    #[must_use]
    pub const fn id_key(self) -> &'static str {
        match self {
            Self::Class | Self::Interface => "class",
            Self::Method => "method",
            Self::ClassMetadata => "metadata",
            Self::Fields => "fields",
            Self::Group(group) => group.id_key(),
        }
    }
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Strategy applied when splitting a parsed file into chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChunkingStrategy {
    /// One chunk per class regardless of size.
    ClassOnly,
    /// One chunk per method regardless of class size.
    MethodOnly,
    /// Whole class when small, method groups when large, single methods when
    /// even a group is too large.
    #[default]
    Adaptive,
}

impl ChunkingStrategy {
    /// Canonical configuration value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ClassOnly => "CLASS_ONLY",
            Self::MethodOnly => "METHOD_ONLY",
            Self::Adaptive => "ADAPTIVE",
        }
    }
}

impl FromStr for ChunkingStrategy {
    type Err = UnknownStrategyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "CLASS_ONLY" => Ok(Self::ClassOnly),
            "METHOD_ONLY" => Ok(Self::MethodOnly),
            "ADAPTIVE" => Ok(Self::Adaptive),
            other => Err(UnknownStrategyError {
                input: other.to_owned(),
            }),
        }
    }
}

impl fmt::Display for ChunkingStrategy {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Error for unrecognized chunking strategy values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStrategyError {
    /// The rejected input.
    pub input: String,
}

impl fmt::Display for UnknownStrategyError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "unknown chunking strategy {:?} (expected CLASS_ONLY, METHOD_ONLY, or ADAPTIVE)",
            self.input
        )
    }
}

impl std::error::Error for UnknownStrategyError {}

/// A bounded, self-contained unit of source text plus metadata.
///
/// Created by the chunker, immutable thereafter; downstream stages copy but
/// never mutate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Deterministic id, unique within one parse run.
    pub id: ChunkId,
    /// Chunk text, possibly prefixed with package/import context.
    pub content: Box<str>,
    /// Kind tag.
    pub kind: ChunkKind,
    /// Declaring class or interface name.
    pub class_name: Box<str>,
    /// Method name, present only for method-level chunks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method_name: Option<Box<str>>,
    /// Declared package, empty when absent.
    pub package_name: Box<str>,
    /// File path relative to the repository root.
    pub file_path: Box<str>,
    /// Raw annotation text attached to the chunked declaration.
    pub annotations: Vec<Box<str>>,
    /// Imports of the source file.
    pub imports: Vec<Box<str>>,
    /// Derived string facts (component roles, counts, method attributes).
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Content length in characters.
    #[must_use]
    pub fn content_len(&self) -> usize {
        self.content.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_kinds_keep_priority_order() {
        assert_eq!(
            MethodGroupKind::ALL,
            [
                MethodGroupKind::RestEndpoints,
                MethodGroupKind::BusinessLogic,
                MethodGroupKind::CrudOperations,
                MethodGroupKind::Accessors,
            ]
        );
    }

    #[test]
    fn kind_tags_and_id_keys_are_stable() {
        assert_eq!(ChunkKind::ClassMetadata.as_str(), "CLASS_METADATA");
        assert_eq!(ChunkKind::ClassMetadata.id_key(), "metadata");
        assert_eq!(ChunkKind::Interface.id_key(), "class");
        assert_eq!(
            ChunkKind::Group(MethodGroupKind::RestEndpoints).as_str(),
            "REST_ENDPOINTS"
        );
        assert_eq!(
            ChunkKind::Group(MethodGroupKind::CrudOperations).id_key(),
            "crud_operations"
        );
    }

    #[test]
    fn strategy_parses_canonical_values() {
        assert_eq!(
            "ADAPTIVE".parse::<ChunkingStrategy>(),
            Ok(ChunkingStrategy::Adaptive)
        );
        assert_eq!(
            "CLASS_ONLY".parse::<ChunkingStrategy>(),
            Ok(ChunkingStrategy::ClassOnly)
        );
        assert!("adaptive".parse::<ChunkingStrategy>().is_err());
    }
}
