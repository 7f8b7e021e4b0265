//! Request-scoped execution context.
//!
//! Every Execute request gets its own context carrying a request id and a
//! `tracing` span. Components receive the context explicitly and log under
//! its span, so concurrent executions never share logging state.

use chrono::{DateTime, Utc};
use tracing::Span;
use uuid::Uuid;

/// Context of a single process execution.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub process: String,
    pub started_at: DateTime<Utc>,
    pub span: Span,
}

impl RequestContext {
    /// Create a context for a new execution of `process`.
    pub fn new(process: impl Into<String>) -> Self {
        let request_id = Uuid::new_v4();
        let process = process.into();
        let span = tracing::info_span!(
            "execute",
            request_id = %request_id,
            process = %process,
        );
        Self {
            request_id,
            process,
            started_at: Utc::now(),
            span,
        }
    }

    /// Milliseconds since the execution started.
    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contexts_are_distinct() {
        let a = RequestContext::new("subset_polygon");
        let b = RequestContext::new("subset_polygon");

        assert_ne!(a.request_id, b.request_id);
        assert_eq!(a.process, "subset_polygon");
        assert!(a.elapsed_ms() >= 0);
    }
}
