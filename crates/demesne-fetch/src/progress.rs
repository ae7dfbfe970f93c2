//! Byte-level progress reporting for binary downloads.

use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub bytes_loaded: u64,
    /// Total size from Content-Length, when the server declares one.
    pub total_bytes: Option<u64>,
    /// Which attempt this transfer belongs to (0 = first try).
    pub retry_count: u32,
}

impl Progress {
    pub fn new(bytes_loaded: u64, total_bytes: Option<u64>, retry_count: u32) -> Self {
        Self {
            bytes_loaded,
            total_bytes,
            retry_count,
        }
    }

    pub fn percentage(&self) -> Option<f32> {
        self.total_bytes.map(|total| {
            if total == 0 {
                0.0
            } else {
                (self.bytes_loaded as f32 / total as f32) * 100.0
            }
        })
    }
}

/// Shared callback invoked as download bytes arrive.
pub type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;
