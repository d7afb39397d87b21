//! # Compilation Results

use chrono::{DateTime, Utc};

use crate::compiler::Compiler;
use crate::dep::DirectMap;

/// The output of compiling one [`Compiler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compilation {
    compiler: Compiler,
    time: DateTime<Utc>,
    requirements: String,
    directs: DirectMap,
}

impl Compilation {
    /// Bundles a resolver output with the configuration and directs it was produced with.
    pub fn new(
        compiler: Compiler,
        time: DateTime<Utc>,
        requirements: impl Into<String>,
        directs: DirectMap,
    ) -> Self {
        Self {
            compiler,
            time,
            requirements: requirements.into(),
            directs,
        }
    }

    /// The configuration compiled.
    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    /// The resolution cutoff the resolver was run with.
    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    /// The requirement text.
    pub fn requirements(&self) -> &str {
        &self.requirements
    }

    /// The direct dependencies every axis was pinned to.
    pub fn directs(&self) -> &DirectMap {
        &self.directs
    }

    /// Consumes the compilation, returning its requirement text.
    pub fn into_requirements(self) -> String {
        self.requirements
    }

    /// Whether the result can be served from cache. Text restored from a lockfile may
    /// be empty, and such a result must be compiled again.
    pub fn is_valid(&self) -> bool {
        !self.requirements.trim().is_empty()
    }
}
