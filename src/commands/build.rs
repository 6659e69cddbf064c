//! Handler for the `build` subcommand.

use anyhow::Result;

use taxicf::config::{resolve_build_config, BuildOptions};

use super::args::BuildArgs;

pub fn run_build(args: BuildArgs, verbose: bool) -> Result<()> {
    let config = resolve_build_config(BuildOptions {
        input_file: args.input,
        output_file: args.output,
        kmer_size: args.kmer_size,
        window_size: args.window_size,
        min_length: args.min_length,
        load_factor: args.load_factor,
        mode: args.mode,
        threads: args.threads,
        tmp_dir: args.tmp_dir,
        config_file: args.config,
        verbose,
    })?;

    taxicf::build::run(&config)
}
