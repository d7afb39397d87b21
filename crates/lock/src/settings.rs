//! # Lock Settings
//!
//! [`Settings`] is the configuration a [`LockManager`](crate::LockManager) runs against:
//! the project root, the canonical axis, the supported matrix and the input files. It
//! is built once from a loaded [`config::Config`] and passed in explicitly, so nothing
//! in this crate reads process-wide state.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use config::{Config, PathsConfig, Platform, ResolverConfig, SubmoduleConfig};
use lazy_regex::{Lazy, Regex};

use crate::compiler::Axis;
use crate::{Error, Result};

#[cfg(test)]
mod test;

//================================================================================================
// Statics
//================================================================================================

static EDITABLE_REGEX: Lazy<Regex> =
    lazy_regex::lazy_regex!(r"(?m)^(?:-e|--editable)\s+(?P<path>.+?)\s*$");

//================================================================================================
// Types
//================================================================================================

/// Explicit, resolved configuration for one project checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    root: PathBuf,
    resolver: ResolverConfig,
    project: Axis,
    interpreter: String,
    matrix: Vec<Axis>,
    paths: PathsConfig,
    submodules: SubmoduleConfig,
}

//================================================================================================
// Impls
//================================================================================================

impl Settings {
    /// Resolves `config` against the project checked out at `root`.
    ///
    /// If the configured runtime-versions file exists it replaces the configured
    /// list of runtime versions.
    pub fn new(config: &Config, root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        let versions_file = root.join(&config.matrix.versions_file);
        let runtime_versions = if versions_file.is_file() {
            read(&versions_file)?
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(ToOwned::to_owned)
                .collect()
        } else {
            config.matrix.runtime_versions.clone()
        };

        let mut matrix: Vec<Axis> = config
            .matrix
            .platforms
            .iter()
            .flat_map(|p| runtime_versions.iter().map(|v| Axis::new(*p, v.as_str())))
            .collect();
        matrix.sort();
        matrix.dedup();

        Ok(Self {
            root,
            resolver: config.resolver.clone(),
            project: Axis::new(config.project.platform, config.project.runtime_version.as_str()),
            interpreter: config.project.interpreter.clone(),
            matrix,
            paths: config.paths.clone(),
            submodules: config.submodules.clone(),
        })
    }

    /// The project root every relative path is resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// How to invoke the resolver.
    pub fn resolver(&self) -> &ResolverConfig {
        &self.resolver
    }

    /// The canonical axis.
    pub fn project(&self) -> &Axis {
        &self.project
    }

    /// Every supported axis, sorted.
    pub fn matrix(&self) -> &[Axis] {
        &self.matrix
    }

    /// Submodule handling.
    pub fn submodules(&self) -> &SubmoduleConfig {
        &self.submodules
    }

    /// The absolute lockfile path for the requested strategy.
    pub fn lockfile(&self, high: bool) -> PathBuf {
        let suffix = if high { "-high" } else { "" };
        self.root
            .join(format!("{}{}.json", self.paths.lockfile, suffix))
    }

    /// The overrides file, as passed to the resolver.
    pub fn overrides(&self) -> String {
        posix(&self.paths.overrides)
    }

    /// The files resolved from: the requirements file first, then the manifest of
    /// every package it lists as editable.
    pub fn source_paths(&self) -> Result<Vec<String>> {
        let requirements = read(&self.root.join(&self.paths.requirements))?;
        let editables = EDITABLE_REGEX
            .captures_iter(&requirements)
            .map(|c| posix(&Path::new(&c["path"]).join(&self.paths.manifest)));

        Ok(std::iter::once(posix(&self.paths.requirements))
            .chain(editables)
            .collect())
    }

    /// The packages whose dependencies must not be resolved, one specifier per line.
    ///
    /// A missing declaration file declares nothing.
    pub fn nodeps(&self) -> Result<Vec<String>> {
        let path = self.root.join(&self.paths.nodeps);
        if !path.exists() {
            return Ok(Vec::new());
        }
        Ok(read(&path)?
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(ToOwned::to_owned)
            .collect())
    }

    /// The project-relative files whose contents determine the direct dependencies.
    pub fn input_files(&self) -> Result<Vec<String>> {
        let mut files = vec![self.overrides(), posix(&self.paths.nodeps)];
        files.extend(self.source_paths()?);
        Ok(files)
    }

    /// The axis of the running environment.
    ///
    /// Explicit values win. Otherwise the platform is the one this binary was built
    /// for and the runtime version is probed from the configured interpreter; either
    /// falls back to the canonical axis when it cannot be determined.
    pub fn running_axis(&self, platform: Option<Platform>, runtime_version: Option<String>) -> Axis {
        let platform = platform.or_else(Platform::current).unwrap_or_else(|| {
            tracing::warn!(
                fallback = %self.project.platform,
                "unrecognized host platform"
            );
            self.project.platform
        });
        let runtime_version = runtime_version
            .or_else(|| probe_runtime_version(&self.interpreter))
            .unwrap_or_else(|| {
                tracing::warn!(
                    interpreter = %self.interpreter,
                    fallback = %self.project.runtime_version,
                    "could not detect the running runtime version"
                );
                self.project.runtime_version.clone()
            });
        Axis::new(platform, runtime_version)
    }
}

//================================================================================================
// Functions
//================================================================================================

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Renders a relative path with forward slashes on every platform.
pub(crate) fn posix(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Extracts `major.minor` from a `<Name> <major>.<minor>[.<patch>...]` banner.
fn parse_runtime_version(banner: &str) -> Option<String> {
    let version = banner.split_whitespace().nth(1)?;
    let mut parts = version.split('.');
    let (major, minor) = (parts.next()?, parts.next()?);
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    (digits(major) && digits(minor)).then(|| format!("{}.{}", major, minor))
}

/// Runs `<interpreter> --version` and parses its banner.
pub fn probe_runtime_version(interpreter: &str) -> Option<String> {
    let output = Command::new(interpreter).arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    // old interpreters print the banner on stderr
    let banner = if output.stdout.is_empty() {
        output.stderr
    } else {
        output.stdout
    };
    parse_runtime_version(&String::from_utf8_lossy(&banner))
}
