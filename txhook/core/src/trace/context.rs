use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Attribute, Timestamp};

/// Free-form data handed to samplers when deciding whether a transaction is recorded.
pub type SamplingContext = Map<String, Value>;

fn is_unset(op: &Option<String>) -> bool {
    op.as_deref().map_or(true, str::is_empty)
}

/// Describes a transaction about to be started.
///
/// `trace_id`, `parent_span_id` and `sampled` are only set when the
/// transaction continues a trace that was started elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionContext {
    pub name: String,
    pub op: Option<String>,
    pub description: Option<String>,
    pub trace_id: Option<u64>,
    pub parent_span_id: Option<u64>,
    pub sampled: Option<bool>,
    pub attributes: Vec<Attribute>,
}

impl TransactionContext {
    pub fn new<N: Into<String>>(name: N) -> Self {
        TransactionContext {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_op<O: Into<String>>(mut self, op: O) -> Self {
        self.op = Some(op.into());
        self
    }

    pub fn with_sampled(mut self, sampled: bool) -> Self {
        self.sampled = Some(sampled);
        self
    }

    /// Continue the trace identified by `trace_id` under `parent_span_id`.
    pub fn continuing(mut self, trace_id: u64, parent_span_id: u64) -> Self {
        self.trace_id = Some(trace_id);
        self.parent_span_id = Some(parent_span_id);
        self
    }

    /// An empty label counts as unset.
    pub fn has_op(&self) -> bool {
        !is_unset(&self.op)
    }
}

/// A request for a child span.
///
/// There are no sampling decision, trace id or parent span id fields: a
/// child always inherits those from the transaction that creates it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChildSpanContext {
    pub op: Option<String>,
    pub description: Option<String>,
    pub attributes: Vec<Attribute>,
    pub start_timestamp: Option<Timestamp>,
}

impl ChildSpanContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_op<O: Into<String>>(mut self, op: O) -> Self {
        self.op = Some(op.into());
        self
    }

    pub fn with_description<D: Into<String>>(mut self, description: D) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn has_op(&self) -> bool {
        !is_unset(&self.op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_op_counts_as_unset() {
        assert!(!TransactionContext::new("checkout").has_op());
        assert!(!TransactionContext::new("checkout").with_op("").has_op());
        assert!(TransactionContext::new("checkout").with_op("navigation").has_op());

        assert!(!ChildSpanContext::new().has_op());
        assert!(ChildSpanContext::new().with_op("db").has_op());
    }

    #[test]
    fn test_continuing_sets_trace_identity() {
        let ctx = TransactionContext::new("downstream").continuing(11, 22);
        assert_eq!(ctx.trace_id, Some(11));
        assert_eq!(ctx.parent_span_id, Some(22));
        assert_eq!(ctx.sampled, None);
    }
}
