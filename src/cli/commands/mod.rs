mod actions;
mod compile;
mod lock;

use anyhow::Context;
use clap::Subcommand;
use config::{Config, Platform};
use ::lock::LockManager;
use ::lock::resolver::ProcessResolver;
use ::lock::settings::Settings;
use ::lock::submodule::GitCli;

use super::Args;
use super::output::Report;

#[derive(Subcommand)]
pub(super) enum Commands {
    /// Print the locked requirements of the running environment.
    ///
    /// The lockfile is checked for staleness first and recompiled only if the
    /// resolver, the declared sources or the direct dependencies changed since
    /// it was written. With `--high`, the newest allowed versions are always
    /// compiled afresh into `lock-high.json`.
    #[command(verbatim_doc_comment)]
    Compile(compile::Args),
    /// Recompile the whole matrix unconditionally.
    ///
    /// Every (platform, runtime version) axis is resolved again with the
    /// direct dependencies of the project axis pinned, and the lockfile is
    /// replaced in a single write.
    #[command(verbatim_doc_comment)]
    Lock(lock::Args),
    /// List the GitHub Actions used by the repository's workflows.
    ///
    /// Paste the output into the "Allow specified actions and reusable
    /// workflows" block of the repository's Actions settings.
    #[command(verbatim_doc_comment)]
    Actions(actions::Args),
}

/// Flags selecting the axis requirements are served for.
#[derive(clap::Parser, Debug, Clone)]
#[command(next_help_heading = "Axis Options")]
pub(super) struct AxisArgs {
    /// Target platform; defaults to the host platform
    #[arg(long, value_name = "PLATFORM")]
    platform: Option<Platform>,
    /// Target runtime version; defaults to the version of the configured interpreter
    #[arg(long, value_name = "VERSION")]
    runtime_version: Option<String>,
}

pub async fn run(args: Args) -> anyhow::Result<()> {
    let report = match args.command {
        Commands::Compile(args) => compile::run(args).await?,
        Commands::Lock(args) => lock::run(args).await?,
        Commands::Actions(args) => actions::run(args)?,
    };
    print!("{}", report);
    Ok(())
}

type Manager = LockManager<ProcessResolver, GitCli>;

/// Builds a lock manager for the project containing the working directory.
fn manager(axis: AxisArgs) -> anyhow::Result<Manager> {
    let config = Config::load()
        .map_err(|e| *e)
        .context("failed to load configuration")?;
    let root = config::project_root();
    tracing::debug!(root = %root.display(), "project root");

    let settings = Settings::new(&config, root)?;
    let running = settings.running_axis(axis.platform, axis.runtime_version);
    tracing::debug!(axis = %running, "running axis");

    Ok(LockManager::new(
        ProcessResolver::new(&settings),
        GitCli::new(settings.root()),
        settings,
        running,
    ))
}

/// Runs blocking lock work off the async runtime.
async fn blocking<F>(work: F) -> anyhow::Result<Report>
where
    F: FnOnce() -> ::lock::Result<String> + Send + 'static,
{
    let requirements = tokio::task::spawn_blocking(work).await??;
    Ok(Report::Requirements(requirements))
}
