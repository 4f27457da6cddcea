//! Java source parsing boundary contract.

use javalens_domain::ParsedFile;
use javalens_shared::Result;

/// Boundary contract for turning Java source text into a structural model.
///
/// Parsing is CPU-bound and synchronous; callers that need it off the async
/// runtime wrap invocations in `spawn_blocking` themselves.
pub trait JavaParserPort: Send + Sync {
    /// Parse a single compilation unit.
    ///
    /// `relative_path` is the repo-relative path of the file, carried through
    /// for diagnostics only.
    fn parse(&self, relative_path: &str, source: &str) -> Result<ParsedFile>;
}
