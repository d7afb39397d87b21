//! What a command prints on stdout.

use std::fmt;

/// The result of a command, rendered on stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Report {
    /// Requirement text, printed verbatim.
    Requirements(String),
    /// One entry per line.
    Lines(Vec<String>),
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Requirements(text) if text.ends_with('\n') => f.write_str(text),
            Report::Requirements(text) => writeln!(f, "{}", text),
            Report::Lines(lines) => lines.iter().try_for_each(|l| writeln!(f, "{}", l)),
        }
    }
}
