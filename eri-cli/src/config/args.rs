//! Command-line argument parsing for integral jobs

use clap::Parser;

/// Four-center electron repulsion integrals from a YAML job description
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    pub config_file: String,

    /// Override the primitive screening threshold
    #[arg(long)]
    pub screening_threshold: Option<f64>,

    /// Override the shell-pair threshold
    #[arg(long)]
    pub pair_threshold: Option<f64>,

    /// Override the Schwarz threshold of the batch fill
    #[arg(long)]
    pub schwarz_threshold: Option<f64>,

    /// Disable Schwarz screening of the batch fill
    #[arg(long)]
    pub no_schwarz: bool,

    /// Spherical component ordering (standard or gaussian)
    #[arg(long)]
    pub ordering: Option<String>,

    /// Number of worker threads (default: all cores)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Override output file: (default stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Write a JSON summary of the run to this file
    #[arg(long)]
    pub json: Option<String>,
}
