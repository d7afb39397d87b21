//! # Direct-Dependency Extraction
//!
//! Turns a block of requirement text, as emitted by the resolver or written by hand,
//! into a [`DirectMap`]. Only lines of the form `<name><operator><revision>` carry
//! dependencies; comments, indented annotations and option lines are ignored.

use crate::dep::{Dep, DirectMap, Name, Op};
use crate::{Error, Result};


//================================================================================================
// Functions
//================================================================================================

/// Whether `line` can never carry a requirement.
fn is_ignored(line: &str) -> bool {
    line.trim().is_empty() || line.starts_with(|c: char| c.is_whitespace() || c == '#' || c == '-')
}

/// Parses a single requirement line.
fn parse_line(line: &str) -> Result<(Name, Dep)> {
    let line = line.trim_end();
    let (name, rest) = line.split_at(Name::prefix_len(line));

    let name = name.parse::<Name>()?;
    let (op, rev) = Op::split_prefix(rest)
        .filter(|(_, rev)| !rev.trim().is_empty())
        .ok_or_else(|| Error::InvalidOperator {
            line: line.to_owned(),
        })?;

    Ok((name, Dep::new(op, rev.trim())))
}

/// Extracts every direct dependency listed in `text`.
///
/// The result does not depend on the order of the lines. A package listed twice with
/// different records fails with [`Error::ConflictingDirect`]; an unknown operator
/// fails with [`Error::InvalidOperator`].
pub fn extract_directs(text: &str) -> Result<DirectMap> {
    let mut directs = DirectMap::default();
    for line in text.lines().filter(|l| !is_ignored(l)) {
        let (name, dep) = parse_line(line)?;
        directs.insert_unique(name, dep)?;
    }
    Ok(directs)
}
