//! # Compiler Configuration
//!
//! A [`Compiler`] is the immutable description of one resolution: which resolver
//! produced it, for which [`Axis`], with which strategy, and from which inputs. Two
//! compilers that compare equal would ask the resolver the very same question, so a
//! cached answer for one is a valid answer for the other.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use config::{Platform, ResolverConfig};
use serde::{Deserialize, Serialize};


//================================================================================================
// Types
//================================================================================================

/// One (platform, runtime version) target of the lock matrix.
///
/// Axes order by platform, then lexically by runtime version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Axis {
    /// The target platform.
    pub platform: Platform,
    /// The target runtime version, e.g. `3.11`.
    pub runtime_version: String,
}

/// Everything that determines the output of a single resolver run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compiler {
    resolver_version: String,
    axis: Axis,
    high: bool,
    no_deps: bool,
    overrides: String,
    paths: Vec<String>,
}

//================================================================================================
// Impls
//================================================================================================

impl Axis {
    /// Constructs an axis.
    pub fn new(platform: Platform, runtime_version: impl Into<String>) -> Self {
        Self {
            platform,
            runtime_version: runtime_version.into(),
        }
    }

    /// The lockfile key of this axis: `{platform}_{runtime_version}`.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.platform, self.runtime_version)
    }
}

impl Compiler {
    /// A compiler resolving the full transitive closure of `paths` on `axis`.
    pub fn new(
        resolver_version: impl Into<String>,
        axis: Axis,
        high: bool,
        overrides: impl Into<String>,
        paths: Vec<String>,
    ) -> Self {
        Self {
            resolver_version: resolver_version.into(),
            axis,
            high,
            no_deps: false,
            overrides: overrides.into(),
            paths,
        }
    }

    /// Reassembles a compiler from its persisted fields.
    pub(crate) fn from_parts(
        resolver_version: String,
        axis: Axis,
        high: bool,
        no_deps: bool,
        overrides: String,
        paths: Vec<String>,
    ) -> Self {
        Self {
            resolver_version,
            axis,
            high,
            no_deps,
            overrides,
            paths,
        }
    }

    /// The same configuration, targeting `axis` instead.
    pub fn on_axis(&self, axis: Axis) -> Self {
        Self {
            axis,
            ..self.clone()
        }
    }

    /// The same configuration, resolving only what is listed in the sources.
    pub fn without_transitive(&self) -> Self {
        Self {
            no_deps: true,
            ..self.clone()
        }
    }

    /// The version of the resolver this configuration targets.
    pub fn resolver_version(&self) -> &str {
        &self.resolver_version
    }

    /// The target axis.
    pub fn axis(&self) -> &Axis {
        &self.axis
    }

    /// Whether the newest allowed versions are preferred.
    pub fn high(&self) -> bool {
        self.high
    }

    /// Whether transitive dependencies are skipped.
    pub fn no_deps(&self) -> bool {
        self.no_deps
    }

    /// The overrides file, relative to the project root.
    pub fn overrides(&self) -> &str {
        &self.overrides
    }

    /// The source paths, relative to the project root.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// The resolver arguments for this configuration, program excluded.
    ///
    /// `time` becomes the `--exclude-newer` cutoff. `constraints`, if any, names a
    /// file pinning the direct dependencies.
    pub fn invocation(
        &self,
        resolver: &ResolverConfig,
        time: DateTime<Utc>,
        constraints: Option<&Path>,
    ) -> Vec<String> {
        let resolution = if self.high { "highest" } else { "lowest-direct" };

        let mut args = resolver.subcommand.clone();
        args.extend([
            "--exclude-newer".to_owned(),
            time.to_rfc3339_opts(SecondsFormat::Micros, true),
            "--python-platform".to_owned(),
            self.axis.platform.to_string(),
            "--python-version".to_owned(),
            self.axis.runtime_version.clone(),
            "--resolution".to_owned(),
            resolution.to_owned(),
            "--override".to_owned(),
            self.overrides.clone(),
        ]);
        args.extend(resolver.extra_args.iter().cloned());
        if self.no_deps {
            args.push("--no-deps".to_owned());
        }
        if let Some(file) = constraints {
            args.push("--constraint".to_owned());
            args.push(file.display().to_string());
        }
        args.extend(self.paths.iter().cloned());
        args
    }
}
