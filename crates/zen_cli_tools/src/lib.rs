//! Status lines printed by the `zen` command line.
//!
//! Every line starts with the symbol of its [`Status`]. Problems go to the
//! standard error stream, everything else to the standard output, where it
//! can be silenced with [`set_quiet`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

pub use owo_colors::{self};
use owo_colors::{OwoColorize, Stream, Style};

static QUIET: AtomicBool = AtomicBool::new(false);

/// Suppresses every status line which doesn't report a problem.
pub fn set_quiet(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Error,
    Warning,
    Info,
    Success,

    /// Indented line belonging to the previous status line.
    Detail,
}

impl Status {
    pub fn symbol(self) -> Option<&'static str> {
        match self {
            Status::Error => Some("×"),
            Status::Warning => Some("⚠"),
            Status::Info => Some("ℹ"),
            Status::Success => Some("✓"),
            Status::Detail => None,
        }
    }

    /// Determines whether the status reports a problem.
    pub fn is_problem(self) -> bool {
        matches!(self, Status::Error | Status::Warning)
    }

    fn style(self) -> Style {
        match self {
            Status::Error => Style::new().red().bold(),
            Status::Warning => Style::new().yellow().bold(),
            Status::Info => Style::new().bright_blue().bold(),
            Status::Success => Style::new().green().bold(),
            Status::Detail => Style::new().dimmed(),
        }
    }

    fn stream(self) -> Stream {
        if self.is_problem() { Stream::Stderr } else { Stream::Stdout }
    }
}

/// Renders a single status line, colorized if the target stream supports it.
pub fn format_line(status: Status, message: &str) -> String {
    let style = status.style();
    let paint = |text: &str| {
        text.if_supports_color(status.stream(), |text| text.style(style))
            .to_string()
    };

    match status.symbol() {
        Some(symbol) => format!("{} {message}", paint(symbol)),
        None => format!("  {}", paint(message)),
    }
}

/// Prints a status line to the stream of the status.
#[allow(clippy::disallowed_macros, reason = "used for CLI logging")]
pub fn emit(status: Status, args: fmt::Arguments<'_>) {
    if is_quiet() && !status.is_problem() {
        return;
    }

    let line = format_line(status, &args.to_string());

    if status.is_problem() {
        eprintln!("{line}");
    } else {
        println!("{line}");
    }
}

/// Prints an error message to the standard error.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::emit($crate::Status::Error, format_args!($($arg)*))
    };
}

/// Prints a warning message to the standard error.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::emit($crate::Status::Warning, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::emit($crate::Status::Info, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        $crate::emit($crate::Status::Success, format_args!($($arg)*))
    };
}

/// Prints an indented line below a previous message.
#[macro_export]
macro_rules! detail {
    ($($arg:tt)*) => {
        $crate::emit($crate::Status::Detail, format_args!($($arg)*))
    };
}
