//! The `apy` command line binary.

#![allow(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

mod memory_stats;

use apy::commands::Cli;
use apy::commands::Commands;
use clap::Parser;

fn main() {
    let cli = Cli::parse();
    let _memory_stats = memory_stats::MemoryStatsGuard;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(cli.verbosity.tracing_level_filter().into())
                .from_env_lossy(),
        )
        .without_time()
        .init();

    let exit = match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            apy::ExitCode::IoError
        }
    };

    std::process::exit(exit.code());
}

/// Dispatches to the subcommand's implementation, returning the exit code
/// its result maps to (spec §6).
fn run(command: Commands) -> anyhow::Result<apy::ExitCode> {
    match command {
        Commands::Init(args) => apy::commands::init::init(args),
        Commands::Build(args) => apy::commands::build::build(args),
        Commands::Check(args) => apy::commands::check::check(args),
        Commands::Test(args) => apy::commands::test::test(args),
        Commands::Fmt(args) => apy::commands::fmt::fmt(args),
        Commands::Repl(args) => apy::commands::repl::repl(args),
    }
}
