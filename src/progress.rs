//! Progress reporting: an optional byte-based bar over the input files, and the
//! periodic "rows read / paired" counter line.

use crate::util::now_rfc3339;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::PathBuf;

pub fn make_progress_bar_labeled(total_bytes: u64, label: Option<&str>) -> ProgressBar {
    let pb = ProgressBar::new(total_bytes);
    let style = ProgressStyle::with_template(
        "{spinner:.green} {msg} {bytes:>10}/{total_bytes:<10} [{bar:.cyan/blue}] {percent:>3}%  \
         {bytes_per_sec}  elapsed: {elapsed_precise}  eta: {eta_precise}"
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█▉▊▋▌▍▎▏  ");
    pb.set_style(style);
    if let Some(msg) = label {
        pb.set_message(msg.to_string());
    }
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

pub fn total_input_size(files: &[PathBuf]) -> u64 {
    files
        .iter()
        .map(|p| fs::metadata(p).map(|m| m.len()).unwrap_or(0))
        .sum()
}

/// Emit the rows-read/paired counter every `interval` rows.
pub struct RowLog {
    interval: u64,
}

impl RowLog {
    pub fn new(interval: u64) -> Self {
        Self { interval: interval.max(1) }
    }

    #[inline]
    pub fn tick(&self, rows_read: u64, paired: u64) {
        if rows_read % self.interval == 0 {
            tracing::info!("Rows Read: {}, Paired: {}, Time: {}", rows_read, paired, now_rfc3339());
        }
    }

    pub fn finish(&self, rows_read: u64, paired: u64) {
        tracing::info!("Total Rows Read: {}, Paired: {}, Time: {}", rows_read, paired, now_rfc3339());
    }
}
