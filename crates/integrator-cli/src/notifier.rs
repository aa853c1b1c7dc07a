//! Console output for integrator runs

use integrator_core::IoNotifier;

/// Progress to stdout, problems to stderr.
pub struct ConsoleNotifier {
    quiet: bool,
}

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self { quiet: false }
    }

    /// Suppress progress lines; warnings and errors are still shown.
    pub fn quiet() -> Self {
        Self { quiet: true }
    }
}

impl IoNotifier for ConsoleNotifier {
    fn write(&self, message: &str) {
        if !self.quiet && !message.is_empty() {
            println!("{message}");
        }
    }

    fn warning(&self, message: &str) {
        eprintln!("Warning: {message}");
    }

    fn error(&self, message: &str) {
        eprintln!("Error: {message}");
    }
}

impl Default for ConsoleNotifier {
    fn default() -> Self {
        Self::new()
    }
}
