//! Atomic publication of portfolio snapshots.
//!
//! Readers always see either the previous snapshot or the new one in full.
//! A failed construction never reaches the publisher, so the last good
//! snapshot stays in place.

use std::sync::Arc;

use concord_core::types::Timestamp;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::info;

use crate::builder::PortfolioResult;

/// A published portfolio with its publication metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedPortfolio {
    /// Monotonic publication counter, starting at 1.
    pub sequence: u64,
    /// Cycle time supplied by the caller.
    pub as_of: Timestamp,
    /// The portfolio.
    pub result: PortfolioResult,
}

/// Holds the current snapshot behind a single pointer swap.
#[derive(Debug, Default)]
pub struct SnapshotPublisher {
    current: RwLock<Option<Arc<PublishedPortfolio>>>,
}

impl SnapshotPublisher {
    /// Creates a publisher with no snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current snapshot and returns the new one.
    pub fn publish(&self, result: PortfolioResult, as_of: Timestamp) -> Arc<PublishedPortfolio> {
        let mut slot = self.current.write();
        let sequence = slot.as_ref().map_or(1, |prev| prev.sequence + 1);
        let snapshot = Arc::new(PublishedPortfolio {
            sequence,
            as_of,
            result,
        });
        *slot = Some(Arc::clone(&snapshot));
        drop(slot);

        info!(
            sequence,
            as_of = %as_of,
            accepted = snapshot.result.accepted_count,
            "Published portfolio snapshot"
        );
        snapshot
    }

    /// Returns the current snapshot, if any.
    #[must_use]
    pub fn current(&self) -> Option<Arc<PublishedPortfolio>> {
        self.current.read().clone()
    }
}
