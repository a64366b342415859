//! Progress reporting for long-running export and erasure operations

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};

/// Counts records fetched and zones deleted
///
/// Shared by every concurrent unit of an operation; the optional spinner
/// shows the running totals.
pub struct ProgressTracker {
    /// Records fetched so far
    records: AtomicU64,
    /// Zones deleted so far
    zones: AtomicU64,
    start_time: Instant,
    bar: Option<ProgressBar>,
}

impl ProgressTracker {
    /// Create a new progress tracker
    ///
    /// # Arguments
    /// * `enable_bar` - Whether to display a spinner
    ///
    /// # Returns
    /// * `Self` - New progress tracker instance
    pub fn new(enable_bar: bool) -> Self {
        let bar = enable_bar.then(|| {
            let bar = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
                bar.set_style(style);
            }
            bar
        });

        Self {
            records: AtomicU64::new(0),
            zones: AtomicU64::new(0),
            start_time: Instant::now(),
            bar,
        }
    }

    /// Tracker that only counts
    pub fn hidden() -> Self {
        Self::new(false)
    }

    /// Add fetched records
    pub fn add_records(&self, count: u64) {
        let total = self.records.fetch_add(count, Ordering::Relaxed) + count;

        if let Some(ref bar) = self.bar {
            bar.tick();
            let elapsed = self.start_time.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                let speed = total as f64 / elapsed;
                bar.set_message(format!("{} records fetched ({:.0} records/sec)", total, speed));
            } else {
                bar.set_message(format!("{} records fetched", total));
            }
        }
    }

    /// Count one deleted zone
    pub fn add_zone(&self) {
        let total = self.zones.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(ref bar) = self.bar {
            bar.tick();
            bar.set_message(format!("{} zone(s) deleted", total));
        }
    }

    pub fn records(&self) -> u64 {
        self.records.load(Ordering::Relaxed)
    }

    pub fn zones(&self) -> u64 {
        self.zones.load(Ordering::Relaxed)
    }

    /// Finish and clear the spinner
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}
