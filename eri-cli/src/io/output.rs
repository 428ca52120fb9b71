//! Logging setup and run summaries

use color_eyre::eyre::{Result, WrapErr};
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::time::SystemTime as StdSystemTime;
use tracing::info;
use tracing_subscriber::{
    fmt::format::Writer, fmt::layer, fmt::time::FormatTime, layer::SubscriberExt,
    util::SubscriberInitExt, Registry,
};

/// Wall-clock time of day, seconds precision
struct SecondPrecisionTimer;

impl FormatTime for SecondPrecisionTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        let duration = StdSystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();

        let total_seconds = duration.as_secs();
        let hours = (total_seconds / 3600) % 24;
        let minutes = (total_seconds / 60) % 60;
        let seconds = total_seconds % 60;

        write!(w, "{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

/// Setup output logging to file or stdout
pub fn setup_output(output_path: Option<&String>) {
    match output_path {
        Some(path) => match File::create(path) {
            Ok(log) => {
                let file_layer = layer()
                    .with_writer(log)
                    .with_timer(SecondPrecisionTimer)
                    .with_ansi(false);
                Registry::default().with(file_layer).init();
                info!("Output will be written to: {}", path);
            }
            Err(e) => eprintln!("Could not create output file {}: {}", path, e),
        },
        None => {
            let stdout_layer = layer()
                .with_writer(std::io::stdout)
                .with_timer(SecondPrecisionTimer)
                .with_ansi(true);
            Registry::default().with(stdout_layer).init();
        }
    }
}

/// Machine-readable outcome of a batch run.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub basis: String,
    pub cache_key: String,
    pub n_shells: usize,
    pub n_functions: usize,
    pub pair_threshold: f64,
    pub n_negligible_pairs: usize,
    pub schwarz_threshold: Option<f64>,
    pub quartets_computed: usize,
    pub quartets_screened: usize,
    pub max_abs_integral: f64,
    /// (pp|pp) for every basis function p
    pub diagonal: Vec<f64>,
    pub elapsed_seconds: f64,
}

pub fn write_summary(path: &str, summary: &RunSummary) -> Result<()> {
    let file = File::create(path).wrap_err_with(|| format!("Failed to create summary file: {}", path))?;
    serde_json::to_writer_pretty(file, summary).wrap_err("Failed to write JSON summary")?;
    info!("Summary written to: {}", path);
    Ok(())
}
