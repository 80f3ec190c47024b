//! Terminal styling helpers
//!
//! Small vocabulary of styles used across command output. Printing goes
//! through `anstream`, which strips the escapes when stdout is not a
//! terminal.

use owo_colors::OwoColorize;
use terminal_link::Link;

/// Check mark glyph.
pub const CHECK: &str = "✓";

/// Styling vocabulary for command output
pub trait Stylize {
    /// De-emphasized detail text
    fn muted(&self) -> String;
    /// Highlighted value (ref names, ids)
    fn accent(&self) -> String;
    /// Bold lead-in text
    fn emphasis(&self) -> String;
    /// Good-news text
    fn success(&self) -> String;
    /// Warning text
    fn warn(&self) -> String;
}

impl<T: std::fmt::Display> Stylize for T {
    fn muted(&self) -> String {
        self.dimmed().to_string()
    }

    fn accent(&self) -> String {
        self.cyan().to_string()
    }

    fn emphasis(&self) -> String {
        self.bold().to_string()
    }

    fn success(&self) -> String {
        self.green().to_string()
    }

    fn warn(&self) -> String {
        self.yellow().to_string()
    }
}

/// Green check mark.
pub fn check() -> String {
    CHECK.green().to_string()
}

/// Render a clickable link where the terminal supports it, falling back to
/// `text <url>`.
pub fn hyperlink(text: &str, url: &str) -> String {
    if supports_hyperlinks::supports_hyperlinks() {
        Link::new(text, url).to_string()
    } else {
        format!("{text} <{url}>")
    }
}
