//! JSON ledger exports.
//!
//! A ledger export is a JSON array of [`TradeRecord`]s in the ledger's wire
//! shape (`agentId`, `pair`, `direction`, ...).

use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use super::TradeRecord;
use crate::error::{ConcordError, Result, StorageError};

/// Reads a JSON ledger export and checks every record's prices.
///
/// # Errors
///
/// - `StorageError::NotFound` if the file does not exist
/// - `StorageError::IoError` if it cannot be read
/// - `StorageError::DeserializationError` if it is not a record array
/// - `ValidationError` for the first record with a non-positive price
pub fn read_ledger_file(path: &Path) -> Result<Vec<TradeRecord>> {
    let shown = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => StorageError::not_found(&shown),
        _ => StorageError::read_error(&shown, e.to_string()),
    })?;
    parse_ledger(&content).inspect(|records| {
        debug!(path = %shown, records = records.len(), "Read ledger file");
    })
}

/// Parses a JSON ledger export held in memory.
///
/// # Errors
///
/// See [`read_ledger_file`].
pub fn parse_ledger(content: &str) -> Result<Vec<TradeRecord>> {
    let records: Vec<TradeRecord> =
        serde_json::from_str(content).map_err(|e| StorageError::DeserializationError {
            reason: e.to_string(),
        })?;
    for record in &records {
        record.validate().map_err(ConcordError::from)?;
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const ONE: &str = r#"[{
        "tradeId": "t-1",
        "agentId": "alpha",
        "pair": "EUR_USD",
        "direction": "long",
        "entryPrice": "1.1000",
        "exitPrice": "1.1011",
        "sessionLabel": "london",
        "regimeLabel": "trend",
        "environment": "live",
        "createdAt": 1704067200000
    }]"#;

    #[test]
    fn test_parse_wire_shape() {
        let records = parse_ledger(ONE).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].agent_id.as_str(), "alpha");
        assert!((records[0].return_fraction() - 0.001).abs() < 1e-9);
    }

    #[test]
    fn test_non_positive_price_is_validation_error() {
        let bad = ONE.replace("\"1.1000\"", "\"0\"");
        let err = parse_ledger(&bad).unwrap_err();
        assert_eq!(err.category(), "validation");
    }

    #[test]
    fn test_garbage_is_deserialization_error() {
        let err = parse_ledger("{\"not\": \"an array\"}").unwrap_err();
        assert!(matches!(
            err,
            ConcordError::Storage(StorageError::DeserializationError { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = read_ledger_file(Path::new("/nonexistent/ledger.json")).unwrap_err();
        assert!(matches!(err, ConcordError::Storage(StorageError::NotFound { .. })));
    }

    #[test]
    fn test_read_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(ONE.as_bytes()).unwrap();
        assert_eq!(read_ledger_file(file.path()).unwrap().len(), 1);
    }
}
