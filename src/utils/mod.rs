//! Utilities module for logging, errors, run logs and image helpers
//!
//! This module provides:
//! - Structured logging with tracing
//! - The crate error type
//! - The metric sink written during training (JSON lines + SVG charts)
//! - Small image helpers for sample grids

pub mod charts;
pub mod error;
pub mod images;
pub mod logging;
pub mod run_log;

// Re-export main types for convenience
pub use error::{ClassifierError, Result};
pub use logging::{init_logging, LogConfig, LogLevel};
pub use run_log::{MemorySink, MetricRecord, MetricsSink, RunLogger};

/// Format a duration in a human-readable way
pub fn format_duration(seconds: f64) -> String {
    if seconds < 60.0 {
        format!("{:.1}s", seconds)
    } else if seconds < 3600.0 {
        let minutes = (seconds / 60.0).floor();
        let secs = seconds % 60.0;
        format!("{}m {:.0}s", minutes as u32, secs)
    } else {
        let hours = (seconds / 3600.0).floor();
        let minutes = ((seconds % 3600.0) / 60.0).floor();
        format!("{}h {}m", hours as u32, minutes as u32)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Mutex, MutexGuard};

    static BACKEND_RNG: Mutex<()> = Mutex::new(());

    /// Serializes tests that initialise models.
    ///
    /// The ndarray backend keeps one process-wide RNG; two tests seeding and drawing
    /// from it concurrently would see each other's draws.
    pub fn backend_rng_lock() -> MutexGuard<'static, ()> {
        BACKEND_RNG.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30.5), "30.5s");
        assert_eq!(format_duration(90.0), "1m 30s");
        assert_eq!(format_duration(3661.0), "1h 1m");
    }
}
