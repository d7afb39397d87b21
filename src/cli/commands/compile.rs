use clap::Parser;

use super::AxisArgs;
use crate::cli::output::Report;

#[derive(Parser, Debug)]
#[command(next_help_heading = "Compile Options")]
#[group(id = "compile_args")]
pub struct Args {
    /// Compile the newest allowed versions instead of the lowest compatible ones
    #[arg(long)]
    high: bool,
    #[command(flatten)]
    axis: AxisArgs,
}

pub(super) async fn run(args: Args) -> anyhow::Result<Report> {
    let manager = super::manager(args.axis)?;
    let high = args.high;
    super::blocking(move || manager.check_compilation(high)).await
}
