use std::process::ExitCode;

use clap::Parser;
use copymark::ui::cli::{Cli, run};

fn main() -> anyhow::Result<ExitCode> {
    let args = Cli::parse();
    copymark::init(args.verbose);
    run(args)
}
