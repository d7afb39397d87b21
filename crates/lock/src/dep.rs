//! # Dependency Records
//!
//! This module contains the atomic values of a resolution: the version operator, the
//! validated package name, the `{op, rev}` dependency record, and the map of direct
//! dependencies keyed by name.
//!
//! ## Name Validation Rules
//!
//! Package names follow the canonical package-name grammar. A name must:
//! - Not be empty
//! - Start and end with an ASCII letter or digit
//! - Contain only ASCII letters, digits, hyphens (`-`), underscores (`_`) and dots (`.`)
//!
//! ## Lockfile Example
//!
//! ```json
//! {
//!   "foo": { "op": "==", "rev": "1.2.3" },
//!   "widget": { "op": " @ ", "rev": "git+https://host/widget.git@deadbeef" }
//! }
//! ```

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::{Error, Result};

#[cfg(test)]
mod test;

//================================================================================================
// Types
//================================================================================================

/// A version-comparison operator joining a package name to its revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Op {
    /// `===`, arbitrary string equality.
    ArbitraryEq,
    /// `==`, exact version match.
    Eq,
    /// `!=`, version exclusion.
    Ne,
    /// `~=`, compatible release.
    Compatible,
    /// `>=`, inclusive lower bound.
    Ge,
    /// `<=`, inclusive upper bound.
    Le,
    /// `>`, exclusive lower bound.
    Gt,
    /// `<`, exclusive upper bound.
    Lt,
    /// ` @ `, a direct URL or VCS reference.
    Url,
}

/// A vetted String suitable for use as a package name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct Name(String);

/// Why a string was rejected as a [`Name`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    /// The name is empty.
    #[error("a package name cannot be empty")]
    Empty,
    /// The name starts with a separator or symbol.
    #[error("a package name cannot start with: '{0}'")]
    InvalidStart(char),
    /// The name ends with a separator or symbol.
    #[error("a package name cannot end with: '{0}'")]
    InvalidEnd(char),
    /// The name contains characters outside the grammar.
    #[error("the package name contains invalid characters: '{0}'")]
    InvalidCharacters(String),
}

/// A resolved dependency: an operator and the revision it applies to.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(deny_unknown_fields)]
pub struct Dep {
    op: Op,
    rev: String,
}

/// Direct dependencies keyed by package name.
///
/// A `BTreeMap` keeps serialization ordered, for consistent and minimal lockfile diffs.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct DirectMap(BTreeMap<Name, Dep>);

//================================================================================================
// Impls
//================================================================================================

impl Op {
    /// Every operator, ordered so that no entry is a prefix of a later one.
    pub const ALL: [Op; 9] = [
        Op::ArbitraryEq,
        Op::Eq,
        Op::Ne,
        Op::Compatible,
        Op::Ge,
        Op::Le,
        Op::Gt,
        Op::Lt,
        Op::Url,
    ];

    /// The operator as it appears in requirement text.
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::ArbitraryEq => "===",
            Op::Eq => "==",
            Op::Ne => "!=",
            Op::Compatible => "~=",
            Op::Ge => ">=",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Lt => "<",
            Op::Url => " @ ",
        }
    }

    /// Splits a leading operator off `s`, preferring the longest match.
    pub fn split_prefix(s: &str) -> Option<(Op, &str)> {
        Op::ALL
            .iter()
            .find_map(|op| s.strip_prefix(op.as_str()).map(|rest| (*op, rest)))
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Op {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Op::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| format!("unrecognized operator `{}`", s))
    }
}

impl Serialize for Op {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Op {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Name {
    fn is_edge(c: char) -> bool {
        c.is_ascii_alphanumeric()
    }

    fn is_inner(c: char) -> bool {
        c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
    }

    fn validate(s: &str) -> std::result::Result<(), NameError> {
        let first = s.chars().next().ok_or(NameError::Empty)?;
        if !Name::is_edge(first) {
            return Err(NameError::InvalidStart(first));
        }

        let invalid: String = s.chars().filter(|c| !Name::is_inner(*c)).collect();
        if !invalid.is_empty() {
            return Err(NameError::InvalidCharacters(invalid));
        }

        match s.chars().last() {
            Some(last) if !Name::is_edge(last) => Err(NameError::InvalidEnd(last)),
            _ => Ok(()),
        }
    }

    /// Length of the longest prefix of `s` made of name characters.
    pub(crate) fn prefix_len(s: &str) -> usize {
        s.find(|c| !Name::is_inner(c)).unwrap_or(s.len())
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Name {
    type Error = NameError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        Name::validate(&s)?;
        Ok(Name(s))
    }
}

impl TryFrom<&str> for Name {
    type Error = NameError;

    fn try_from(s: &str) -> std::result::Result<Self, Self::Error> {
        Name::try_from(s.to_owned())
    }
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Name::try_from(s).map_err(|source| Error::InvalidName {
            name: s.to_owned(),
            source,
        })
    }
}

impl Deref for Name {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Borrow<str> for Name {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Dep {
    /// Constructs a dependency record.
    pub fn new(op: Op, rev: impl Into<String>) -> Self {
        Self {
            op,
            rev: rev.into(),
        }
    }

    /// A direct reference to `commit` of the git repository at `url`.
    pub fn git(url: &str, commit: &str) -> Self {
        Dep::new(Op::Url, format!("git+{}@{}", url, commit))
    }

    /// The operator.
    pub fn op(&self) -> Op {
        self.op
    }

    /// The revision.
    pub fn rev(&self) -> &str {
        &self.rev
    }

    /// Renders the record as a requirement line for `name`.
    pub fn requirement(&self, name: &Name) -> String {
        format!("{}{}{}", name, self.op, self.rev)
    }
}

impl DirectMap {
    /// Number of direct dependencies.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no direct dependencies.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Looks up the record for `name`.
    pub fn get(&self, name: &str) -> Option<&Dep> {
        self.0.get(name)
    }

    /// Iterates in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&Name, &Dep)> {
        self.0.iter()
    }

    /// Inserts a record, failing if `name` is already present with a different record.
    pub fn insert_unique(&mut self, name: Name, dep: Dep) -> Result<()> {
        match self.0.entry(name) {
            Entry::Vacant(e) => {
                e.insert(dep);
                Ok(())
            },
            Entry::Occupied(e) if e.get() == &dep => Ok(()),
            Entry::Occupied(e) => Err(Error::ConflictingDirect {
                name: e.key().to_string(),
                first: e.get().requirement(e.key()),
                second: dep.requirement(e.key()),
            }),
        }
    }

    /// Layers `top` over `self`: entries of `top` win on name collisions.
    pub fn layered(mut self, top: DirectMap) -> DirectMap {
        self.0.extend(top.0);
        self
    }

    /// Renders one requirement line per entry, in name order.
    pub fn to_requirements(&self) -> String {
        self.iter()
            .map(|(name, dep)| dep.requirement(name))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl FromIterator<(Name, Dep)> for DirectMap {
    fn from_iter<T: IntoIterator<Item = (Name, Dep)>>(iter: T) -> Self {
        DirectMap(iter.into_iter().collect())
    }
}
