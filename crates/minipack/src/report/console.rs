//! Terminal reporter.

use console::{style, Term};
use std::io::Write;

use super::progress::Spinner;
use super::Reporter;

/// Verbosity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

/// Reporter writing styled lines to stderr, with a spinner for step progress
pub struct ConsoleReporter {
    term: Term,
    verbosity: Verbosity,
    spinner: Spinner,
}

impl ConsoleReporter {
    pub fn new(verbosity: Verbosity) -> Self {
        let term = Term::stderr();
        let interactive = term.is_term() && verbosity > Verbosity::Quiet;

        Self {
            term,
            verbosity,
            spinner: Spinner::new(interactive),
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    fn should_output(&self, min_verbosity: Verbosity) -> bool {
        self.verbosity >= min_verbosity
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new(Verbosity::Normal)
    }
}

impl Reporter for ConsoleReporter {
    fn info(&self, message: &str) {
        self.spinner.clear();
        if self.should_output(Verbosity::Normal) {
            let _ = writeln!(&self.term, "{} {}", style("ℹ").cyan(), message);
        }
    }

    fn success(&self, message: &str) {
        self.spinner.clear();
        if self.should_output(Verbosity::Normal) {
            let _ = writeln!(&self.term, "{} {}", style("✔").green(), message);
        }
    }

    fn warn(&self, message: &str) {
        self.spinner.clear();
        if self.should_output(Verbosity::Normal) {
            let _ = writeln!(&self.term, "{} {}", style("Warning:").yellow().bold(), message);
        }
    }

    fn error(&self, message: &str) {
        self.spinner.clear();
        let _ = writeln!(&self.term, "{} {}", style("Error:").red().bold(), message);
    }

    fn progress(&self, message: &str) {
        if self.spinner.is_enabled() {
            self.spinner.set_message(message);
        } else if self.should_output(Verbosity::Verbose) {
            let _ = writeln!(&self.term, "{}", style(message).dim());
        }
    }
}
