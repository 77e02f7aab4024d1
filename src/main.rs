mod app;
mod cli;
mod logging;
mod paths;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    let _logger = logging::init(cli.global.verbose)?;
    app::run(cli)
}
