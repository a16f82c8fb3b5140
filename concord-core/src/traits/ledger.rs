//! Paginated trade ledger access.
//!
//! The ledger is an external collaborator. Implementations return pages of
//! at most `limit` rows; a page shorter than `limit` marks the end of data.
//!
//! # Example
//!
//! ```ignore
//! use concord_core::traits::{fetch_all, InMemoryLedger};
//!
//! let ledger = InMemoryLedger::new(trades);
//! let all = fetch_all(&ledger, 1000).await?;
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::data::TradeRecord;
use crate::error::StorageError;

/// Source of closed-trade records.
#[async_trait]
pub trait TradeLedger: Send + Sync {
    /// Returns the ledger name used in logs.
    fn name(&self) -> &str;

    /// Fetches up to `limit` records starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns the backend's `StorageError` unchanged.
    async fn fetch_page(&self, offset: usize, limit: usize)
    -> Result<Vec<TradeRecord>, StorageError>;
}

/// Requests pages until a short page signals end-of-data.
///
/// Errors from any page abort the whole fetch and are returned untouched.
/// No page is retried.
///
/// # Errors
///
/// Returns `StorageError::InvalidPage` for a zero `page_size`, or the first
/// error the ledger reports.
pub async fn fetch_all(
    ledger: &dyn TradeLedger,
    page_size: usize,
) -> Result<Vec<TradeRecord>, StorageError> {
    if page_size == 0 {
        return Err(StorageError::InvalidPage {
            offset: 0,
            limit: page_size,
        });
    }

    let mut records = Vec::new();
    let mut offset = 0;
    let mut pages = 0_usize;
    loop {
        let page = ledger.fetch_page(offset, page_size).await?;
        let len = page.len();
        pages += 1;
        debug!(ledger = %ledger.name(), offset, rows = len, "Fetched ledger page");
        records.extend(page);
        if len < page_size {
            break;
        }
        offset += len;
    }

    debug!(
        ledger = %ledger.name(),
        pages,
        total = records.len(),
        "Ledger fetch complete"
    );
    Ok(records)
}

/// In-memory ledger for tests and file-backed front ends.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    records: RwLock<Vec<TradeRecord>>,
    pages_served: AtomicUsize,
}

impl InMemoryLedger {
    /// Creates a ledger holding `records` in the given order.
    #[must_use]
    pub fn new(records: Vec<TradeRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            pages_served: AtomicUsize::new(0),
        }
    }

    /// Appends a record.
    pub fn push(&self, record: TradeRecord) {
        self.records.write().push(record);
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if the ledger is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Returns how many pages have been served so far.
    #[must_use]
    pub fn pages_served(&self) -> usize {
        self.pages_served.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TradeLedger for InMemoryLedger {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn fetch_page(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<TradeRecord>, StorageError> {
        self.pages_served.fetch_add(1, Ordering::Relaxed);
        let records = self.records.read();
        Ok(records.iter().skip(offset).take(limit).cloned().collect())
    }
}
