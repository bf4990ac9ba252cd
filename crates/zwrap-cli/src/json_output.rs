//! JSON output structures for the zwrap CLI

use serde::{Deserialize, Serialize};
use zwrap_types::{Backend, StreamTotals};

/// Summary of one compress or decompress run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummaryJson {
    /// zwrap version
    pub version: String,
    /// `compress` or `decompress`
    pub operation: String,
    /// Backend that handled the stream
    pub backend: Option<Backend>,
    /// Bytes read
    pub total_in: u64,
    /// Bytes written
    pub total_out: u64,
    /// total_out / total_in
    pub ratio: f64,
    /// Wall time in seconds
    pub duration_seconds: f64,
}

impl RunSummaryJson {
    /// Build a summary from a finished stream's totals
    pub fn new(
        operation: &str,
        backend: Option<Backend>,
        totals: StreamTotals,
        duration_seconds: f64,
    ) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            operation: operation.to_string(),
            backend,
            total_in: totals.total_in,
            total_out: totals.total_out,
            ratio: totals.ratio(),
            duration_seconds,
        }
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Result of sniffing a file header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SniffJson {
    /// File that was inspected
    pub path: String,
    /// Backend the header routes to
    pub backend: Backend,
    /// First bytes of the file, hex encoded
    pub header: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_serializes_backend_in_snake_case() {
        let totals = StreamTotals {
            total_in: 100,
            total_out: 25,
        };
        let summary = RunSummaryJson::new("compress", Some(Backend::BlockCodec), totals, 0.5);
        let json = summary.to_json().unwrap();
        assert!(json.contains("\"backend\": \"block_codec\""));

        let parsed: RunSummaryJson = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, summary);
    }
}
