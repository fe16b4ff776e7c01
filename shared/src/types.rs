//! Common types used across the platform

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Failure of one item in a batch operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ItemError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub error: String,
}

/// Per-item outcome of a batch operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult<T> {
    pub total_requested: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<ItemError>,
    pub processed: Vec<T>,
}

impl<T> BatchResult<T> {
    pub fn new(total_requested: usize) -> Self {
        Self {
            total_requested,
            successful: 0,
            failed: 0,
            errors: Vec::new(),
            processed: Vec::new(),
        }
    }

    pub fn record_success(&mut self, item: T) {
        self.successful += 1;
        self.processed.push(item);
    }

    pub fn record_failure(&mut self, id: Option<Uuid>, error: impl Into<String>) {
        self.failed += 1;
        self.errors.push(ItemError {
            id,
            error: error.into(),
        });
    }

    /// Some items failed
    pub fn is_partial(&self) -> bool {
        self.failed > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_counts() {
        let mut batch: BatchResult<&str> = BatchResult::new(3);
        batch.record_success("a");
        batch.record_success("b");
        assert!(!batch.is_partial());

        batch.record_failure(Some(Uuid::nil()), "not found");
        assert!(batch.is_partial());
        assert_eq!(batch.successful, 2);
        assert_eq!(batch.failed, 1);
        assert_eq!(batch.errors[0].error, "not found");
    }
}
