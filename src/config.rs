//! Session configuration.
//!
//! Loaded from camelCase JSON. Every field has a default, so `{}` is a valid
//! configuration; unknown fields are rejected.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A rectangular window anchored at A1, in rows × columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Window {
    pub rows: u32,
    pub cols: u32,
}

impl Window {
    #[must_use]
    pub const fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }

    /// Whether `addr` falls inside the window.
    #[must_use]
    pub fn contains(&self, addr: crate::cell_ref::CellAddress) -> bool {
        addr.row < self.rows && addr.col < self.cols
    }

    /// Every address in the window, row-major.
    pub fn addresses(self) -> impl Iterator<Item = crate::cell_ref::CellAddress> {
        (0..self.rows).flat_map(move |row| {
            (0..self.cols).map(move |col| crate::cell_ref::CellAddress::new(row, col))
        })
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::new(100, 50)
    }
}

/// Tunables for an evidence session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct EvidenceConfig {
    /// Preview cache capacity. 0 disables caching.
    pub max_cache_entries: usize,
    pub max_cache_age_ms: u64,
    /// Size ceiling for non-PDF uploads.
    pub max_upload_bytes: u64,
    /// Window visited by the reconciler's discovery pass.
    pub scan_window: Window,
    /// Window whose cell text is written to the exported workbook.
    pub export_window: Window,
    pub poll_interval_ms: u64,
    pub event_debounce_ms: u64,
    pub sweep_interval_ms: u64,
    pub preload_delay_ms: u64,
    /// Prefix of exported archive names.
    pub project_prefix: String,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            max_cache_entries: 100,
            max_cache_age_ms: 30 * 60 * 1000,
            max_upload_bytes: 50 * 1024 * 1024,
            scan_window: Window::default(),
            export_window: Window::default(),
            poll_interval_ms: 1000,
            event_debounce_ms: 100,
            sweep_interval_ms: 5 * 60 * 1000,
            preload_delay_ms: 100,
            project_prefix: "TicknTie_Project".to_string(),
        }
    }
}

impl EvidenceConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    #[must_use]
    pub fn max_cache_age(&self) -> Duration {
        Duration::from_millis(self.max_cache_age_ms)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn event_debounce(&self) -> Duration {
        Duration::from_millis(self.event_debounce_ms)
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    #[must_use]
    pub fn preload_delay(&self) -> Duration {
        Duration::from_millis(self.preload_delay_ms)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::error::EvidenceError;

    #[test]
    fn test_empty_json_is_default() {
        let cfg = EvidenceConfig::from_json("{}").unwrap();
        assert_eq!(cfg, EvidenceConfig::default());
        assert_eq!(cfg.max_cache_age(), Duration::from_secs(1800));
        assert_eq!(cfg.max_upload_bytes, 52_428_800);
    }

    #[test]
    fn test_partial_override() {
        let cfg = EvidenceConfig::from_json(
            r#"{"maxCacheEntries": 5, "scanWindow": {"rows": 10, "cols": 4}}"#,
        )
        .unwrap();
        assert_eq!(cfg.max_cache_entries, 5);
        assert_eq!(cfg.scan_window, Window::new(10, 4));
        assert_eq!(cfg.export_window, Window::new(100, 50));
        assert_eq!(cfg.poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = EvidenceConfig::from_json(r#"{"maxCacheEntrys": 5}"#).unwrap_err();
        assert!(matches!(err, EvidenceError::Config(_)));
    }

    #[test]
    fn test_window_addresses_row_major() {
        let cells: Vec<_> = Window::new(2, 2).addresses().map(|a| a.to_a1()).collect();
        assert_eq!(cells, ["A1", "B1", "A2", "B2"]);
    }
}
