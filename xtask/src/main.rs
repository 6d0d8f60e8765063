use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(author, version, about = "copymark automation commands", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run cargo nextest across the workspace
    Nextest {
        #[arg(long)]
        profile: Option<String>,
        #[arg(long)]
        release: bool,
        /// Restrict the run to one package
        #[arg(long, short)]
        package: Option<String>,
        /// Extra filter expression passed through to nextest
        filter: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Nextest {
            profile,
            release,
            package,
            filter,
        } => run_nextest(profile, release, package, filter)?,
    }
    Ok(())
}

fn run_nextest(
    profile: Option<String>,
    release: bool,
    package: Option<String>,
    filter: Option<String>,
) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("nextest").arg("run");
    match package {
        Some(package) => cmd.arg("--package").arg(package),
        None => cmd.arg("--workspace"),
    };
    if let Some(profile) = profile {
        cmd.arg("--profile").arg(profile);
    }
    if release {
        cmd.arg("--release");
    }
    if let Some(filter) = filter {
        cmd.arg(filter);
    }
    let status = cmd.status()?;
    if !status.success() {
        anyhow::bail!("cargo nextest run failed");
    }
    Ok(())
}
