use anyhow::Result;
use clap::Parser;
use dex_method_diff::cli::Cli;
use dex_method_diff::config::RunConfig;
use dex_method_diff::dex::DexError;
use dex_method_diff::pipeline;
use std::io::{BufWriter, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // The dex reader has already reported format errors.
            if err.downcast_ref::<DexError>().is_none() {
                eprintln!("Failed: {err:#}");
            }
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = RunConfig::from_cli(cli)?;
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    pipeline::run(&config, &mut out)?;
    out.flush()?;
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}
