//! Answer-explanation boundary contract.

use crate::BoxFuture;
use javalens_shared::{RequestContext, Result};

/// Owned request for a prose explanation of retrieved code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplainRequest {
    /// The user's original question.
    pub question: Box<str>,
    /// Rendered code context (top matches with similarity headers).
    pub context: Box<str>,
}

/// Boundary contract for generating a prose answer from retrieved context.
///
/// Query orchestration works without an explainer; when one is wired in, its
/// output is attached to the outcome verbatim.
pub trait ExplainerPort: Send + Sync {
    /// Produce a prose explanation for the question given the code context.
    fn explain(
        &self,
        ctx: &RequestContext,
        request: ExplainRequest,
    ) -> BoxFuture<'_, Result<Box<str>>>;
}
