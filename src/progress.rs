use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::fetch::FetchObserver;
use crate::window::TimeWindow;

/// Terminal spinner that tracks window progress. Only shown on a TTY.
pub struct SpinnerObserver {
    bar: ProgressBar,
    windows: AtomicUsize,
    done: AtomicUsize,
    records: AtomicUsize,
}

impl SpinnerObserver {
    pub fn new_if_tty(message: &str) -> Option<Self> {
        if !std::io::stderr().is_terminal() {
            return None;
        }
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})") {
            bar.set_style(style);
        }
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));
        Some(Self {
            bar,
            windows: AtomicUsize::new(0),
            done: AtomicUsize::new(0),
            records: AtomicUsize::new(0),
        })
    }

    /// Stop the spinner, leaving `message` in its place
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Stop the spinner and erase it
    pub fn clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl FetchObserver for SpinnerObserver {
    fn fetch_started(&self, windows: usize, workers: usize) {
        self.windows.store(windows, Ordering::Relaxed);
        if windows > 1 {
            self.bar.set_message(format!(
                "Fetching PRs in {} chunks with {} workers...",
                windows, workers
            ));
        }
    }

    fn window_fetched(&self, window: &TimeWindow, records: usize) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        let total = self.records.fetch_add(records, Ordering::Relaxed) + records;
        self.bar.set_message(format!(
            "Fetched {}/{} chunks, {} PRs (last: {})",
            done,
            self.windows.load(Ordering::Relaxed),
            total,
            window
        ));
        log::debug!("Fetched {} PRs for {}", records, window);
    }

    fn fetch_finished(&self, total: usize) {
        self.bar.set_message(format!("Fetched {} PRs", total));
    }
}
