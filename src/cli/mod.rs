mod commands;
pub mod logging;
mod output;

use std::path::PathBuf;

use clap::Parser;
pub use commands::run;

/// Lock a project's requirements across a matrix of platforms and runtime versions.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Run as if started in DIR
    ///
    /// The project, its `reqlock.toml` and its lockfiles are looked up from the
    /// given directory instead of the current one.
    #[arg(short = 'C', value_name = "DIR", global = true, value_parser = validate_dir)]
    directory: Option<PathBuf>,

    #[command(flatten)]
    pub log: LogArgs,

    #[command(subcommand)]
    command: commands::Commands,
}

/// Logging flags shared by every command.
#[derive(Parser, Clone, Copy, Debug)]
#[command(next_help_heading = "Log Options")]
pub struct LogArgs {
    /// Log more: `-v` for DEBUG, `-vv` for TRACE
    ///
    /// `RUST_LOG` takes precedence over this flag.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log less: `-q` for WARN, `-qq` for ERROR
    ///
    /// Wins over both `--verbose` and `RUST_LOG`, so scripts reading the
    /// requirement text from stdout can silence stderr.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    quiet: u8,
}

impl Args {
    /// Moves into the `-C` directory, if one was given.
    pub fn enter_directory(&self) -> std::io::Result<()> {
        match &self.directory {
            Some(dir) => {
                std::env::set_current_dir(dir)?;
                tracing::debug!(dir = %dir.display(), "changed directory");
                Ok(())
            },
            None => Ok(()),
        }
    }
}

fn validate_dir(path: &str) -> Result<PathBuf, String> {
    let dir = std::fs::canonicalize(path).map_err(|e| format!("`{}`: {}", path, e))?;
    if dir.is_dir() {
        Ok(dir)
    } else {
        Err(format!("`{}` is not a directory", path))
    }
}
