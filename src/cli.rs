use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "dex-method-diff", version)]
#[command(about = "DEX per-package/class method diff between consecutive builds")]
pub struct Cli {
    /// Mapping files, positionally aligned with the expanded inputs.
    #[arg(long, value_name = "FILE,...", value_delimiter = ',')]
    pub mapping: Vec<PathBuf>,

    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[arg(short, long)]
    pub verbose: bool,

    /// dex, apk, jar files or directories of them, oldest first.
    #[arg(value_name = "FILE|DIR", required = true)]
    pub inputs: Vec<PathBuf>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
