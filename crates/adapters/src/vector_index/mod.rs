//! Vector index adapters.

mod chroma;

pub use chroma::{ChromaConfig, ChromaVectorIndex};
