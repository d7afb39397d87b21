//! # Submodule Dependencies
//!
//! Internally developed packages vendored as version-control submodules are locked at
//! their checked-out commit. This module reads the two pieces of metadata involved,
//! the configured path/URL pairs and the current commit of every path, and joins them
//! into direct references of the form `git+<url>@<commit>`.
//!
//! Reading the metadata sits behind the [`SubmoduleSource`] trait so the join itself,
//! [`resolve_submodules`], stays a pure function.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use config::SubmoduleConfig;

use crate::dep::{Dep, DirectMap, Name};
use crate::{Error, Result};


/// Submodule metadata keyed by submodule path, relative to the work tree.
pub type PathMap = BTreeMap<PathBuf, String>;

/// Markers `git submodule status` prefixes to a commit.
const STATUS_MARKERS: &[char] = &['+', '-', 'U'];

//================================================================================================
// Types
//================================================================================================

/// A source of submodule metadata.
pub trait SubmoduleSource {
    /// The configured URL of every submodule.
    fn urls(&self) -> Result<PathMap>;
    /// The checked-out commit of every submodule, possibly carrying a status marker.
    fn commits(&self) -> Result<PathMap>;
}

/// Reads submodule metadata with the `git` command line.
#[derive(Debug, Clone)]
pub struct GitCli {
    root: PathBuf,
}

//================================================================================================
// Impls
//================================================================================================

impl GitCli {
    /// Reads the submodules of the work tree at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn run(&self, args: &[&str]) -> Result<Option<String>> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.root)
            .args(args)
            .output()
            .map_err(|source| Error::Spawn {
                program: "git".into(),
                source,
            })?;

        if output.status.success() {
            Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
        } else if output.status.code() == Some(1) && output.stderr.is_empty() {
            // `git config --get-regexp` exits 1 when nothing matches
            Ok(None)
        } else {
            Err(Error::Vcs {
                args: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            })
        }
    }
}

impl SubmoduleSource for GitCli {
    fn urls(&self) -> Result<PathMap> {
        if !self.root.join(".gitmodules").exists() {
            return Ok(PathMap::new());
        }
        let out = self.run(&[
            "config",
            "--file",
            ".gitmodules",
            "--get-regexp",
            r"^submodule\..*\.(path|url)$",
        ])?;
        parse_gitmodules(out.as_deref().unwrap_or_default())
    }

    fn commits(&self) -> Result<PathMap> {
        if !self.root.join(".gitmodules").exists() {
            return Ok(PathMap::new());
        }
        let out = self.run(&["submodule", "status"])?;
        Ok(parse_status(out.as_deref().unwrap_or_default()))
    }
}

//================================================================================================
// Functions
//================================================================================================

/// Joins the `path` and `url` keys of `.gitmodules` by submodule name.
fn parse_gitmodules(text: &str) -> Result<PathMap> {
    let mut paths = BTreeMap::new();
    let mut urls = BTreeMap::new();

    for line in text.lines() {
        let Some((key, value)) = line.split_once(' ') else {
            continue;
        };
        let Some((name, field)) = key
            .strip_prefix("submodule.")
            .and_then(|k| k.rsplit_once('.'))
        else {
            continue;
        };
        match field {
            "path" => {
                paths.insert(name.to_owned(), PathBuf::from(value.trim()));
            },
            "url" => {
                urls.insert(name.to_owned(), value.trim().to_owned());
            },
            _ => {},
        }
    }

    paths
        .into_iter()
        .map(|(name, path)| match urls.remove(&name) {
            Some(url) => Ok((path, url)),
            None => Err(Error::SubmoduleMismatch {
                detail: format!("submodule `{}` has a path but no url", name),
            }),
        })
        .collect()
}

/// Parses `git submodule status` into path -> raw commit.
fn parse_status(text: &str) -> PathMap {
    text.lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let commit = fields.next()?;
            let path = fields.next()?;
            Some((PathBuf::from(path), commit.to_owned()))
        })
        .collect()
}

fn describe(paths: &[&PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// The package name a submodule path is locked under.
fn package_name(path: &Path, prefix: &str) -> Result<Name> {
    let path_str = path.to_string_lossy();
    let name = match path_str.strip_prefix(prefix) {
        Some(stripped) if !stripped.is_empty() => stripped.to_owned(),
        _ => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path_str.clone().into_owned()),
    };
    name.parse()
}

/// Synthesizes one direct reference per submodule.
///
/// `urls` and `commits` must describe the same set of paths, or this fails with
/// [`Error::SubmoduleMismatch`]. Excluded paths, see
/// [`SubmoduleConfig::is_excluded`], never produce a record.
pub fn resolve_submodules(
    urls: &PathMap,
    commits: &PathMap,
    config: &SubmoduleConfig,
) -> Result<DirectMap> {
    let no_commit: Vec<_> = urls.keys().filter(|p| !commits.contains_key(*p)).collect();
    let no_url: Vec<_> = commits.keys().filter(|p| !urls.contains_key(*p)).collect();
    if !no_commit.is_empty() || !no_url.is_empty() {
        return Err(Error::SubmoduleMismatch {
            detail: format!(
                "configured but not checked out: [{}]; checked out but not configured: [{}]",
                describe(&no_commit),
                describe(&no_url)
            ),
        });
    }

    let mut directs = DirectMap::default();
    for (path, url) in urls {
        if config.is_excluded(path) {
            tracing::trace!(path = %path.display(), "skipping excluded submodule");
            continue;
        }
        let commit = commits[path].trim_start_matches(STATUS_MARKERS);
        let name = package_name(path, &config.prefix)?;
        directs.insert_unique(name, Dep::git(url, commit))?;
    }
    Ok(directs)
}

/// Reads `source` and resolves its submodules.
pub fn submodule_directs<S: SubmoduleSource + ?Sized>(
    source: &S,
    config: &SubmoduleConfig,
) -> Result<DirectMap> {
    resolve_submodules(&source.urls()?, &source.commits()?, config)
}
