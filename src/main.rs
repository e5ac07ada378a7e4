//! ctxfmt CLI entry point.

use clap::Parser;
use ctxfmt::cli::{self, Cli, Commands, EXIT_ERROR};

fn main() {
    let cli = Cli::parse();
    ctxfmt::init_tracing(cli.verbose);

    let result = match &cli.command {
        Commands::Def(args) => cli::run_def(args),
        Commands::Call(args) => cli::run_call(args),
        Commands::Init(args) => cli::run_init(args),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
