//! # Resolution Invoker
//!
//! The external resolver is a process boundary: it receives a command line and either
//! prints the resolved requirements or exits with a non-zero status and a diagnostic.
//! The [`Resolver`] trait is that boundary; [`ProcessResolver`] crosses it for real,
//! and [`invoke`] builds every command line the lock machinery needs.

use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

use chrono::{DateTime, Utc};

use crate::compiler::Compiler;
use crate::dep::DirectMap;
use crate::settings::Settings;
use crate::{Error, Result};

#[cfg(test)]
mod test;

//================================================================================================
// Types
//================================================================================================

/// An external dependency resolver.
pub trait Resolver {
    /// The resolver's version, recorded with every lockfile.
    fn version(&self) -> Result<String>;

    /// Runs a compilation with `args` (program excluded) and returns its stdout.
    ///
    /// A non-zero exit fails with [`Error::ResolutionFailed`].
    fn run(&self, args: &[String]) -> Result<String>;
}

/// Runs the resolver executable as a child process in the project root.
#[derive(Debug, Clone)]
pub struct ProcessResolver {
    program: PathBuf,
    root: PathBuf,
}

/// Rendered resolver output, stamped with the cutoff it was computed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    /// The `--exclude-newer` cutoff.
    pub time: DateTime<Utc>,
    /// The complete requirement text: declaration block and resolved lines.
    pub requirements: String,
}

//================================================================================================
// Impls
//================================================================================================

impl ProcessResolver {
    /// The resolver configured in `settings`.
    ///
    /// A relative program path containing a separator is taken relative to the project
    /// root; a bare name is looked up on `PATH`.
    pub fn new(settings: &Settings) -> Self {
        let program = &settings.resolver().program;
        let program = if program.is_relative() && program.components().count() > 1 {
            settings.root().join(program)
        } else {
            program.clone()
        };
        Self {
            program,
            root: settings.root().to_path_buf(),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.current_dir(&self.root);
        cmd
    }

    fn spawn_error(&self, source: std::io::Error) -> Error {
        Error::Spawn {
            program: self.program.clone(),
            source,
        }
    }
}

impl Resolver for ProcessResolver {
    fn version(&self) -> Result<String> {
        let output = self
            .command()
            .arg("--version")
            .output()
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(Error::ResolutionFailed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        let banner = String::from_utf8_lossy(&output.stdout);
        banner
            .split_whitespace()
            .nth(1)
            .map(ToOwned::to_owned)
            .ok_or_else(|| Error::ResolverVersion(banner.trim().to_owned()))
    }

    fn run(&self, args: &[String]) -> Result<String> {
        tracing::debug!(program = %self.program.display(), args = %args.join(" "), "running resolver");
        let output = self
            .command()
            .args(args)
            .output()
            .map_err(|e| self.spawn_error(e))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(Error::ResolutionFailed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }
}

//================================================================================================
// Functions
//================================================================================================

/// Assembles the requirement text: the no-transitive declarations, then the resolver output.
pub fn render(nodeps: &[String], resolved: &str) -> String {
    let mut text = String::from("# nodeps\n");
    for line in nodeps {
        text.push_str(line);
        text.push('\n');
    }
    text.push_str("# compilation\n");
    let resolved = resolved.trim_end();
    if !resolved.is_empty() {
        text.push_str(resolved);
        text.push('\n');
    }
    text
}

/// Runs `resolver` for `compiler`, pinning `pinned` directs if given.
///
/// The cutoff time is captured right before the run. Pinned directs are handed to the
/// resolver through a temporary constraints file that lives for the duration of the run.
pub fn invoke<R: Resolver + ?Sized>(
    resolver: &R,
    settings: &Settings,
    compiler: &Compiler,
    pinned: Option<&DirectMap>,
) -> Result<Output> {
    let nodeps = settings.nodeps()?;

    let constraints = match pinned {
        Some(directs) => {
            let mut file = tempfile::Builder::new()
                .prefix("constraints-")
                .suffix(".txt")
                .tempfile()?;
            writeln!(file, "{}", directs.to_requirements())?;
            file.flush()?;
            Some(file)
        },
        None => None,
    };

    let time = Utc::now();
    let args = compiler.invocation(
        settings.resolver(),
        time,
        constraints.as_ref().map(|f| f.path()),
    );
    let resolved = resolver.run(&args)?;
    drop(constraints);

    Ok(Output {
        time,
        requirements: render(&nodeps, &resolved),
    })
}
