//! # Lockfile
//!
//! The lockfile is a JSON document with one entry per compiled axis. The canonical
//! axis lives under the `"direct"` key together with everything needed to reproduce
//! it: the compiler configuration, the direct dependencies every axis was pinned to,
//! and a fingerprint of the inputs they were derived from. Every other key is an axis
//! key (`linux_3.11`) holding only a timestamp and the requirement text.
//!
//! ```json
//! {
//!   "direct": {
//!     "time": "2024-05-01T12:30:15Z",
//!     "resolver_version": "0.4.18",
//!     "project_platform": "linux",
//!     "project_runtime_version": "3.11",
//!     "no_deps": false,
//!     "high": false,
//!     "paths": ["requirements/dev.in"],
//!     "overrides": "requirements/override.txt",
//!     "directs": { "foo": { "op": "==", "rev": "1.2.3" } },
//!     "requirements": "foo==1.2.3"
//!   },
//!   "linux_3.11": { "time": "2024-05-01T12:30:16Z", "requirements": "..." }
//! }
//! ```
//!
//! The document is only ever replaced as a whole, see [`Lockfile::write_atomic`].

use std::collections::BTreeMap;
use std::io::{ErrorKind, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use config::Platform;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::compilation::Compilation;
use crate::compiler::{Axis, Compiler};
use crate::dep::DirectMap;
use crate::{Error, Result};

#[cfg(test)]
mod test;

//================================================================================================
// Types
//================================================================================================

/// The canonical entry of the lockfile.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DirectEntry {
    time: DateTime<Utc>,
    resolver_version: String,
    project_platform: Platform,
    project_runtime_version: String,
    no_deps: bool,
    high: bool,
    paths: Vec<String>,
    overrides: String,
    directs: DirectMap,
    requirements: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inputs: Option<String>,
}

/// The entry of one matrix axis.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AxisEntry {
    time: DateTime<Utc>,
    requirements: String,
}

/// The persisted lock document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Lockfile {
    direct: DirectEntry,
    #[serde(flatten)]
    axes: BTreeMap<String, AxisEntry>,
}

//================================================================================================
// Impls
//================================================================================================

impl Lockfile {
    /// Starts a document from the canonical compilation and its input fingerprint.
    pub fn new(canonical: &Compilation, inputs: Option<String>) -> Self {
        let compiler = canonical.compiler();
        let axis = compiler.axis();
        Self {
            direct: DirectEntry {
                time: canonical.time(),
                resolver_version: compiler.resolver_version().to_owned(),
                project_platform: axis.platform,
                project_runtime_version: axis.runtime_version.clone(),
                no_deps: compiler.no_deps(),
                high: compiler.high(),
                paths: compiler.paths().to_vec(),
                overrides: compiler.overrides().to_owned(),
                directs: canonical.directs().clone(),
                requirements: canonical.directs().to_requirements(),
                inputs,
            },
            axes: BTreeMap::new(),
        }
    }

    /// Records the compilation of one matrix axis.
    pub fn insert(&mut self, compilation: &Compilation) {
        self.axes.insert(
            compilation.compiler().axis().key(),
            AxisEntry {
                time: compilation.time(),
                requirements: compilation.requirements().to_owned(),
            },
        );
    }

    /// Loads the document at `path`.
    ///
    /// A missing file is `Ok(None)`; an empty or unparseable one is
    /// [`Error::LockfileCorrupt`].
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(Error::Read {
                    path: path.to_path_buf(),
                    source,
                });
            },
        };

        let corrupt = |reason: String| Error::LockfileCorrupt {
            path: path.to_path_buf(),
            reason,
        };
        if text.trim().is_empty() {
            return Err(corrupt("the document is empty".into()));
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| corrupt(e.to_string()))
    }

    /// Renders the document: two-space indentation and a trailing newline.
    pub fn to_string_pretty(&self) -> Result<String> {
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        Ok(text)
    }

    /// Replaces the document at `path`, which is never left partially written.
    pub fn write_atomic(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let prefix = path
            .file_name()
            .map(|n| format!(".{}", n.to_string_lossy()))
            .unwrap_or_else(|| ".lock".to_owned());

        let mut tmp = NamedTempFile::with_prefix_in(prefix, dir)?;
        tmp.write_all(self.to_string_pretty()?.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path)?;
        Ok(())
    }

    /// The canonical compiler configuration the document was produced with.
    pub fn compiler(&self) -> Compiler {
        let d = &self.direct;
        Compiler::from_parts(
            d.resolver_version.clone(),
            Axis::new(d.project_platform, d.project_runtime_version.as_str()),
            d.high,
            d.no_deps,
            d.overrides.clone(),
            d.paths.clone(),
        )
    }

    /// The direct dependencies every axis was pinned to.
    pub fn directs(&self) -> &DirectMap {
        &self.direct.directs
    }

    /// The fingerprint of the inputs the directs were derived from, if recorded.
    pub fn inputs(&self) -> Option<&str> {
        self.direct.inputs.as_deref()
    }

    /// The cached compilation of `axis`, if the document holds one.
    pub fn compilation(&self, axis: &Axis) -> Option<Compilation> {
        self.axes.get(&axis.key()).map(|entry| {
            Compilation::new(
                self.compiler().on_axis(axis.clone()),
                entry.time,
                entry.requirements.clone(),
                self.direct.directs.clone(),
            )
        })
    }

    /// Keys of the recorded matrix axes, sorted.
    pub fn axis_keys(&self) -> impl Iterator<Item = &str> {
        self.axes.keys().map(String::as_str)
    }
}
