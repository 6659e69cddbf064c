use clap::Parser;

mod commands;

use commands::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    taxicf::logging::init_logger(cli.verbose);

    let result = match cli.command {
        Commands::Build(args) => commands::run_build(args, cli.verbose),
        Commands::Inspect(args) => commands::run_inspect(args),
    };

    if let Err(err) = result {
        log::error!("{:#}", err);
        std::process::exit(1);
    }
}
