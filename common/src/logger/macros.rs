use tracing::{Span, field};

use super::TraceId;

/// Root span for one coordinator dispatch. `outcome` is recorded when the
/// fetch settles.
pub fn dispatch_span(request_id: &str, category: &str, trace_id: &TraceId) -> Span {
    tracing::info_span!(
        "dispatch",
        request_id = %request_id,
        category = %category,
        trace_id = %trace_id,
        generation = field::Empty,
        outcome = field::Empty
    )
}
