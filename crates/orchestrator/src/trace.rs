//! Distributed-tracing seam. Observability only, never control flow.

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::error::BrokerError;

/// Handle for one span opened by a [`SpanTracer`].
#[derive(Debug, Clone)]
pub struct SpanHandle {
    pub id: Uuid,
    pub name: String,
    pub started_at: DateTime<Utc>,
}

impl SpanHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            started_at: Utc::now(),
        }
    }
}

/// Tracing collaborator: span start/error/finish.
pub trait SpanTracer: Send + Sync {
    fn start_span(&self, name: &str) -> SpanHandle;

    /// Mark the span as errored. Called before `finish` when a phase fails.
    fn set_error(&self, span: &SpanHandle, error: &BrokerError);

    fn finish(&self, span: SpanHandle);
}

/// Tracer for callers without a tracing backend.
pub struct NoopTracer;

impl SpanTracer for NoopTracer {
    fn start_span(&self, name: &str) -> SpanHandle {
        SpanHandle::new(name)
    }

    fn set_error(&self, _span: &SpanHandle, _error: &BrokerError) {}

    fn finish(&self, _span: SpanHandle) {}
}

/// Tracer that mirrors span lifecycle onto the log stream.
pub struct LogSpanTracer;

impl SpanTracer for LogSpanTracer {
    fn start_span(&self, name: &str) -> SpanHandle {
        let span = SpanHandle::new(name);
        debug!(span_id = %span.id, span = %span.name, "Span started");
        span
    }

    fn set_error(&self, span: &SpanHandle, error: &BrokerError) {
        debug!(span_id = %span.id, span = %span.name, error = %error, "Span errored");
    }

    fn finish(&self, span: SpanHandle) {
        let elapsed_ms = (Utc::now() - span.started_at).num_milliseconds();
        debug!(span_id = %span.id, span = %span.name, elapsed_ms, "Span finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_handles_are_unique() {
        let tracer = NoopTracer;
        let a = tracer.start_span("deploy-broker");
        let b = tracer.start_span("deploy-broker");
        assert_ne!(a.id, b.id);
        assert_eq!(a.name, b.name);
    }

    #[test]
    fn test_log_tracer_full_lifecycle() {
        let tracer = LogSpanTracer;
        let span = tracer.start_span("deploy-broker");
        tracer.set_error(&span, &BrokerError::Interrupted);
        tracer.finish(span);
    }
}
