//! reqlock, a lockfile compiler for multi-platform requirement sets.

#![warn(missing_docs)]

pub mod cli;
