mod cli;
mod commands;
mod errors;
mod libs;
mod logger;
mod schemas;

use clap::Parser;
use cli::cmd_enums::{Cli, Commands};
use commands::{install, version};

fn main() {
    let cli = Cli::parse();
    logger::init(cli.debug);

    let code = match cli.command.unwrap_or(Commands::Install(cli.install)) {
        Commands::Install(args) => install::run(args),
        Commands::Version { check, config } => version::run(check, config),
    };

    std::process::exit(code);
}
