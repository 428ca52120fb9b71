//! One batch run: basis assembly, evaluator setup, Schwarz bounds and the
//! full AO tensor fill.

use crate::config::Config;
use crate::io::{load_basis, resolve_basis_path, RunSummary};
use color_eyre::eyre::{Result, WrapErr};
use eri::{fill_tensor, EriBuilder, SchwarzBounds};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

pub fn run_job(config: &Config, config_file: &str) -> Result<RunSummary> {
    let start = Instant::now();
    let params = &config.eri_params;
    let options = params.to_options()?;

    info!("\nPreparing basis set...");
    let path = resolve_basis_path(config_file, &config.basis_file);
    let basis = Arc::new(load_basis(&path, &config.geometry)?);
    info!(
        "  {} atoms, {} shells, {} basis functions, max l = {}",
        config.geometry.len(),
        basis.len(),
        basis.n_functions(),
        basis.max_am()
    );

    info!("\nInitializing integral evaluator...");
    info!("  Screening threshold: {:.3e}", options.screening_threshold);
    info!("  Pair threshold: {:.3e}", options.pair_threshold);
    info!("  Spherical ordering: {:?}", options.ordering);
    let evaluator = EriBuilder::new()
        .options(options)
        .initialize(0, [basis.clone(), basis.clone(), basis.clone(), basis.clone()])
        .wrap_err("Failed to initialize the integral evaluator")?;
    let table = evaluator.bra_table();
    info!(
        "  {} shell pairs, {} negligible, {} scratch values",
        table.n_pairs(),
        table.n_negligible(),
        evaluator.sizes().total()
    );

    let bounds = match params.schwarz_threshold() {
        Some(threshold) => {
            info!("\nComputing Schwarz bounds (threshold {:.3e})...", threshold);
            Some(SchwarzBounds::compute(&evaluator, threshold).wrap_err("Failed to compute Schwarz bounds")?)
        }
        None => None,
    };

    info!("\nFilling the AO integral tensor...");
    let tensor = fill_tensor(&evaluator, bounds.as_ref()).wrap_err("Integral evaluation failed")?;
    let n = tensor.dims[0];
    let max_abs = tensor.values.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    let diagonal: Vec<f64> = (0..n).map(|p| tensor.get(p, p, p, p)).collect();
    let elapsed = start.elapsed().as_secs_f64();

    info!("  Quartets computed: {}", tensor.computed);
    info!("  Quartets screened: {}", tensor.screened);
    info!("  Largest |(pq|rs)|: {:.10}", max_abs);
    for (p, value) in diagonal.iter().enumerate() {
        info!("  ({:>3}{:>3}|{:>3}{:>3}) = {:.10}", p, p, p, p, value);
    }
    info!("\nFinished in {:.3} s", elapsed);

    Ok(RunSummary {
        basis: basis.name.clone(),
        cache_key: evaluator.cache_key(),
        n_shells: basis.len(),
        n_functions: n,
        pair_threshold: options.pair_threshold,
        n_negligible_pairs: table.n_negligible(),
        schwarz_threshold: bounds.as_ref().map(|b| b.threshold),
        quartets_computed: tensor.computed,
        quartets_screened: tensor.screened,
        max_abs_integral: max_abs,
        diagonal,
        elapsed_seconds: elapsed,
    })
}
