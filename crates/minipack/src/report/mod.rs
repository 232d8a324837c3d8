//! Progress and result reporting.
//!
//! The pipeline never depends on what a reporter does with an event; it is
//! purely for display. [`ConsoleReporter`] renders to the terminal,
//! [`MemoryReporter`] records events for inspection.

mod console;
mod progress;

use std::sync::Mutex;

pub use console::{ConsoleReporter, Verbosity};
pub use progress::Spinner;

/// Receives the user-facing events of a vendoring run
pub trait Reporter: Send + Sync {
    fn info(&self, message: &str);

    fn success(&self, message: &str);

    fn warn(&self, message: &str);

    fn error(&self, message: &str);

    /// Transient status of the step currently running ("Unpacking...").
    ///
    /// Replaced by the next progress message and cleared by any other event.
    fn progress(&self, _message: &str) {}
}

/// Kind of a recorded event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Info,
    Success,
    Warn,
    Error,
    Progress,
}

/// Reporter that keeps every event in memory
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<(EventKind, String)>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events in the order they were reported
    pub fn events(&self) -> Vec<(EventKind, String)> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Messages of one kind, in order
    pub fn messages(&self, kind: EventKind) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, message)| message)
            .collect()
    }

    fn record(&self, kind: EventKind, message: &str) {
        if let Ok(mut events) = self.events.lock() {
            events.push((kind, message.to_string()));
        }
    }
}

impl Reporter for MemoryReporter {
    fn info(&self, message: &str) {
        self.record(EventKind::Info, message);
    }

    fn success(&self, message: &str) {
        self.record(EventKind::Success, message);
    }

    fn warn(&self, message: &str) {
        self.record(EventKind::Warn, message);
    }

    fn error(&self, message: &str) {
        self.record(EventKind::Error, message);
    }

    fn progress(&self, message: &str) {
        self.record(EventKind::Progress, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_reporter_keeps_order() {
        let reporter = MemoryReporter::new();
        reporter.progress("Downloading vue...");
        reporter.success("vue@3.4.1");
        reporter.warn("careful");

        assert_eq!(
            reporter.events(),
            vec![
                (EventKind::Progress, "Downloading vue...".to_string()),
                (EventKind::Success, "vue@3.4.1".to_string()),
                (EventKind::Warn, "careful".to_string()),
            ]
        );
        assert_eq!(reporter.messages(EventKind::Success), vec!["vue@3.4.1"]);
    }
}
