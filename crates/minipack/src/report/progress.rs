//! Spinner for the step currently running.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// A lazily started spinner that can be cleared and restarted
pub struct Spinner {
    bar: Mutex<Option<ProgressBar>>,
    enabled: bool,
}

impl Spinner {
    pub fn new(enabled: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            enabled,
        }
    }

    /// Show `message`, starting the spinner if it is not running
    pub fn set_message(&self, message: &str) {
        if !self.enabled {
            return;
        }

        let Ok(mut bar) = self.bar.lock() else {
            return;
        };

        match bar.as_ref() {
            Some(pb) => pb.set_message(message.to_string()),
            None => *bar = Some(Self::create(message)),
        }
    }

    /// Stop and erase the spinner, if one is running
    pub fn clear(&self) {
        if let Ok(mut bar) = self.bar.lock() {
            if let Some(pb) = bar.take() {
                pb.finish_and_clear();
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn create(message: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.clear();
    }
}
