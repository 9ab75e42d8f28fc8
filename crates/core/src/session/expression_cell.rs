use std::sync::{Arc, Mutex, PoisonError};

use crate::detection::domain::expression_aggregator::DominantExpression;

/// Shared, observable "current expression" slot.
///
/// Written by the scheduler thread after each pass, read by the UI.
#[derive(Clone, Default)]
pub struct ExpressionCell {
    inner: Arc<Mutex<Option<DominantExpression>>>,
}

impl ExpressionCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<DominantExpression> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set(&self, value: Option<DominantExpression>) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = value;
    }

    pub fn clear(&self) {
        self.set(None);
    }

    /// Label of the current expression, if any.
    pub fn label(&self) -> Option<String> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|d| d.label.clone())
    }
}
