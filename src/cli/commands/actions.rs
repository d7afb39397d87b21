use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use clap::Parser;
use lazy_regex::{Lazy, Regex};
use thiserror::Error;

use crate::cli::output::Report;

static USES_REGEX: Lazy<Regex> =
    lazy_regex::lazy_regex!(r#"uses:\s*["']?(?P<action>[^\s"'@]+)@"#);

#[derive(Parser, Debug)]
#[command(next_help_heading = "Actions Options")]
#[group(id = "actions_args")]
pub struct Args {
    /// Directory holding the workflow files, relative to the project root
    #[arg(long, default_value = ".github/workflows")]
    workflows: PathBuf,
}

#[derive(Error, Debug)]
pub(super) enum Error {
    #[error("no workflow directory at `{}`", .0.display())]
    NotFound(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub(super) fn run(args: Args) -> Result<Report, Error> {
    let dir = config::project_root().join(&args.workflows);
    Ok(Report::Lines(workflow_actions(&dir)?))
}

/// Every action referenced by the workflows in `dir`, as sorted unique `<action>@*,`
/// allow-list entries.
fn workflow_actions(dir: &Path) -> Result<Vec<String>, Error> {
    if !dir.is_dir() {
        return Err(Error::NotFound(dir.to_path_buf()));
    }

    let mut actions = BTreeSet::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let contents = std::fs::read_to_string(&path)?;
        let found = USES_REGEX
            .captures_iter(&contents)
            .map(|c| format!("{}@*,", &c["action"]));
        actions.extend(found);
        tracing::debug!(workflow = %path.display(), "scanned");
    }
    Ok(actions.into_iter().collect())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn collects_sorted_unique_actions() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(
            dir.path().join("ci.yml"),
            r#"
jobs:
  test:
    steps:
      - uses: actions/checkout@v4
      - uses: "astral-sh/setup-uv@v3"
      - uses: actions/checkout@v4
"#,
        )?;
        std::fs::write(
            dir.path().join("release.yaml"),
            "jobs:\n  r:\n    uses: org/repo/.github/workflows/release.yml@main\n",
        )?;

        assert_eq!(
            workflow_actions(dir.path())?,
            [
                "actions/checkout@*,",
                "astral-sh/setup-uv@*,",
                "org/repo/.github/workflows/release.yml@*,",
            ]
        );
        Ok(())
    }

    #[test]
    fn missing_directory_is_reported() {
        let err = workflow_actions(Path::new("/nonexistent/workflows")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
