use clap::Parser;

use super::AxisArgs;
use crate::cli::output::Report;

#[derive(Parser, Debug)]
#[command(next_help_heading = "Lock Options")]
#[group(id = "lock_args")]
pub struct Args {
    /// Lock the newest allowed versions into `lock-high.json`
    #[arg(long)]
    high: bool,
    #[command(flatten)]
    axis: AxisArgs,
}

pub(super) async fn run(args: Args) -> anyhow::Result<Report> {
    let manager = super::manager(args.axis)?;
    let high = args.high;
    super::blocking(move || manager.lock(high)).await
}
