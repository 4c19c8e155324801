//! Growth tracking for an archive that is still being written.
//!
//! Purely observational: the numbers end up in status lines, never in
//! completion decisions.

use std::time::{Duration, SystemTime};

/// Snapshot of archive growth between two polls
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthSnapshot {
    /// Current size in bytes
    pub size: u64,

    /// Bytes/second since the previous poll
    pub bytes_per_second: u64,

    /// Time spent in the stability phase so far
    pub elapsed: Duration,
}

/// Tracks archive size over time
pub struct GrowthTracker {
    started: SystemTime,
    last_time: SystemTime,
    last_size: u64,
}

impl GrowthTracker {
    pub fn new(started: SystemTime, initial_size: u64) -> Self {
        Self {
            started,
            last_time: started,
            last_size: initial_size,
        }
    }

    /// Record a new size observation
    pub fn update(&mut self, now: SystemTime, size: u64) -> GrowthSnapshot {
        let window = now.duration_since(self.last_time).unwrap_or_default().as_secs_f64();

        let bytes_per_second = if window > 0.0 {
            (size.saturating_sub(self.last_size) as f64 / window) as u64
        } else {
            0
        };

        self.last_time = now;
        self.last_size = size;

        GrowthSnapshot {
            size,
            bytes_per_second,
            elapsed: now.duration_since(self.started).unwrap_or_default(),
        }
    }
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// Format speed as human-readable string
pub fn format_speed(bytes_per_second: u64) -> String {
    format!("{}/s", format_bytes(bytes_per_second))
}

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs();
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}
