use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Controls how resolved numbers are printed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Outputs the resolved number and link rewrite as JSON.
    Json,
    /// Outputs the resolved number as human-readable text.
    Pretty,
}

/// A utility that resolves call tracking phone numbers from vendor config URLs.
///
/// Every URL is fetched at most once per invocation, repeated URLs share one
/// fetch. The output format can be controlled with the `--format` option.
#[derive(Clone, Parser, Debug)]
#[command(author, version, about, long_about)]
pub struct Cli {
    /// The config URLs to resolve.
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// The path to a YAML configuration file.
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// The output format.
    #[arg(long, short, value_enum, default_value_t = OutputFormat::Pretty)]
    pub format: OutputFormat,
}
