//! Terminal output

use console::style;

/// Styled status line on stderr, so stdout stays machine-readable
pub fn status(quiet: bool, label: &str, message: impl std::fmt::Display) {
    if !quiet {
        eprintln!("{:>12} {message}", style(label).green().bold());
    }
}

/// Styled warning on stderr
pub fn warning(message: impl std::fmt::Display) {
    eprintln!("{} {message}", style("warning:").yellow().bold());
}
