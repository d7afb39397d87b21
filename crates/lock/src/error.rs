//! # Lock Errors
//!
//! This module contains the error type shared by every stage of compilation and locking.

use std::path::PathBuf;

use thiserror::Error;

use crate::dep::NameError;

//================================================================================================
// Types
//================================================================================================

/// An error encountered while extracting, resolving, or locking dependencies.
#[derive(Error, Debug)]
pub enum Error {
    /// A requirement line has a legal name but no recognized operator.
    #[error("invalid operator in requirement `{line}`")]
    InvalidOperator {
        /// The offending line, verbatim.
        line: String,
    },
    /// A requirement line or submodule does not carry a legal package name.
    #[error("invalid package name `{name}`")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        #[source]
        source: NameError,
    },
    /// The same package was listed twice with different records.
    #[error("conflicting requirements for `{name}`: `{first}` and `{second}`")]
    ConflictingDirect {
        /// The duplicated package.
        name: String,
        /// The first requirement seen.
        first: String,
        /// The conflicting requirement.
        second: String,
    },
    /// The submodule configuration and the checked-out state disagree.
    #[error("submodule metadata is inconsistent: {detail}")]
    SubmoduleMismatch {
        /// Which paths are missing from which source.
        detail: String,
    },
    /// The external resolver exited unsuccessfully.
    #[error("resolver failed (exit code {}):\n{stderr}", .code.map_or("none".to_owned(), |c| c.to_string()))]
    ResolutionFailed {
        /// The exit code, if the process was not killed by a signal.
        code: Option<i32>,
        /// The resolver's diagnostic output, verbatim.
        stderr: String,
    },
    /// The resolver's version banner could not be understood.
    #[error("unexpected resolver version output: `{0}`")]
    ResolverVersion(String),
    /// The persisted lockfile is empty, unparseable, or incomplete.
    #[error("lockfile `{}` is corrupt: {reason}", .path.display())]
    LockfileCorrupt {
        /// The lockfile path.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },
    /// A `git` invocation failed.
    #[error("`git {args}` failed: {stderr}")]
    Vcs {
        /// The arguments passed to git.
        args: String,
        /// Git's diagnostic output.
        stderr: String,
    },
    /// An external program could not be started at all.
    #[error("failed to launch `{}`", .program.display())]
    Spawn {
        /// The program that failed to start.
        program: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A required input file could not be read.
    #[error("failed to read `{}`", .path.display())]
    Read {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A transparent wrapper for a [`std::io::Error`]
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A transparent wrapper for a [`serde_json::Error`]
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
    /// A transparent wrapper for a [`tempfile::PersistError`]
    #[error(transparent)]
    Persist(#[from] tempfile::PersistError),
}

/// A specialized `Result` type for lock operations.
pub type Result<T> = std::result::Result<T, Error>;

//================================================================================================
// Impls
//================================================================================================

impl Error {
    /// Whether the error only means the cached state must be rebuilt.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::LockfileCorrupt { .. })
    }
}
