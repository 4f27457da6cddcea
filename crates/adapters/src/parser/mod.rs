//! Java source parsing adapters.

mod java;

pub use java::TreeSitterJavaParser;
