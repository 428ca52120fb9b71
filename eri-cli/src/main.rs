mod config;
mod io;
mod job;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use config::{Args, Config};
use io::{setup_output, write_summary};
use std::fs;
use tracing::info;

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    setup_output(args.output.as_ref());

    info!("Reading configuration from: {}", args.config_file);
    let config_content = fs::read_to_string(&args.config_file)
        .wrap_err_with(|| format!("Unable to read configuration file: {}", args.config_file))?;
    let mut config = serde_yml::from_str::<Config>(&config_content)
        .wrap_err("Failed to parse configuration file")?
        .with_defaults();
    config.eri_params.apply_args(&args);

    if let Some(threads) = config.eri_params.threads {
        info!("Using {} worker threads", threads);
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .wrap_err("Failed to configure the thread pool")?;
    }

    let summary = job::run_job(&config, &args.config_file)?;

    if let Some(ref path) = args.json {
        write_summary(path, &summary)?;
    }

    Ok(())
}
