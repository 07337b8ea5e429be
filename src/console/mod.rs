//! User-facing status lines
//!
//! `INFO:` and `WARNING:` lines go to stdout and are silenced by
//! `non_verbose`; `ERROR:` lines always go to stderr.

use colored::Colorize;

/// Prints prefixed, coloured status lines
#[derive(Debug, Clone, Copy)]
pub struct Console {
    verbose: bool,
}

impl Console {
    /// Create a console; `verbose = false` hides info and warning lines
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Console honouring a `non_verbose` flag
    pub fn from_non_verbose(non_verbose: bool) -> Self {
        Self::new(!non_verbose)
    }

    /// Whether info and warning lines are shown
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Print an `INFO:` line
    pub fn info(&self, message: impl AsRef<str>) {
        if self.verbose {
            println!("{}", format_info(message.as_ref()));
        }
    }

    /// Print a `WARNING:` line
    pub fn warn(&self, message: impl AsRef<str>) {
        if self.verbose {
            println!("{}", format_warning(message.as_ref()));
        }
    }

    /// Print an `ERROR:` line
    pub fn error(&self, message: impl AsRef<str>) {
        eprintln!("{}", format_error(message.as_ref()));
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new(true)
    }
}

/// `INFO: <message>` with a green prefix
pub fn format_info(message: &str) -> String {
    format!("{} {}", "INFO:".green(), message)
}

/// `WARNING: <message>` with a yellow prefix
pub fn format_warning(message: &str) -> String {
    format!("{} {}", "WARNING:".yellow(), message)
}

/// `ERROR: <message>` with a red prefix
pub fn format_error(message: &str) -> String {
    format!("{} {}", "ERROR:".red(), message)
}
