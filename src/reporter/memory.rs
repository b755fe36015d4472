//! Reporter that keeps finished spans in memory.
//!
//! Used by tests and by callers that want to inspect spans in-process.

use std::sync::{Arc, Mutex, PoisonError};

use crate::reporter::Reporter;
use crate::tracer::FinishedSpan;

#[derive(Debug, Clone, Default)]
pub struct InMemoryReporter {
    spans: Arc<Mutex<Vec<FinishedSpan>>>,
}

impl InMemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every span reported so far.
    pub fn spans(&self) -> Vec<FinishedSpan> {
        self.spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.spans.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Reporter for InMemoryReporter {
    fn report(&self, span: FinishedSpan) {
        self.spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(span);
    }
}
