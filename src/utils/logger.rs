use std::env;

/// ANSI color codes for console output
pub struct Colors;

impl Colors {
    /// Within limits - #5FADEB
    pub const MAIN: &'static str = "\x1b[38;2;95;173;235m";
    /// Info - #4A9BD9
    pub const SECONDARY: &'static str = "\x1b[38;2;74;155;217m";
    /// Labels - #808080
    pub const DIM_GRAY: &'static str = "\x1b[38;2;128;128;128m";
    /// Errors - #FF3B30
    pub const ERROR: &'static str = "\x1b[38;2;255;59;48m";
    /// Limit reached - #FF9500
    pub const WARNING: &'static str = "\x1b[38;2;255;149;0m";
    pub const RESET: &'static str = "\x1b[0m";
    pub const BOLD: &'static str = "\x1b[1m";
}

/// Unicode symbols for different message types
pub struct Symbols;

impl Symbols {
    pub const SUCCESS: &'static str = "✓";
    pub const ERROR: &'static str = "✗";
    pub const WARNING: &'static str = "!";
    pub const INFO: &'static str = "ℹ";
    pub const ARROW: &'static str = "→";
}

/// Console output for the run summary and fatal errors.
///
/// Diagnostics go through `tracing`; this is only what a person running the
/// tool by hand (or reading cron mail) needs to see.
pub struct Logger;

impl Logger {
    pub fn success(message: &str) {
        println!("{}", paint(Colors::MAIN, &format!("{} {}", Symbols::SUCCESS, message)));
    }

    /// Errors go to stderr
    pub fn error(message: &str) {
        eprintln!("{}", paint(Colors::ERROR, &format!("{} {}", Symbols::ERROR, message)));
    }

    pub fn warning(message: &str) {
        println!("{}", paint(Colors::WARNING, &format!("{} {}", Symbols::WARNING, message)));
    }

    pub fn info(message: &str) {
        println!("{}", paint(Colors::SECONDARY, &format!("{} {}", Symbols::INFO, message)));
    }

    /// Key-value detail line, e.g. "  daily → 1.20G / 1.00G"
    pub fn detail(label: &str, value: &str) {
        println!(
            "  {} {} {}",
            paint(Colors::DIM_GRAY, label),
            Symbols::ARROW,
            paint(Colors::SECONDARY, value)
        );
    }

    pub fn section(title: &str) {
        println!("{}", paint(&format!("{}{}", Colors::BOLD, Colors::MAIN), title));
    }

    /// Error followed by a dimmed hint line
    pub fn error_with_hint(error: &str, hint: &str) {
        Self::error(error);
        eprintln!(
            "  {}",
            paint(Colors::DIM_GRAY, &format!("{} {}", Symbols::ARROW, hint))
        );
    }
}

fn paint(color: &str, text: &str) -> String {
    if should_use_colors() {
        format!("{}{}{}", color, text, Colors::RESET)
    } else {
        text.to_string()
    }
}

/// Check if colors should be disabled
pub fn should_use_colors() -> bool {
    // Disable colors if NO_COLOR is set or if not a TTY
    env::var("NO_COLOR").is_err() && console::Term::stdout().is_term()
}
