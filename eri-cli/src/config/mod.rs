//! Job configuration: geometry, basis library and integral parameters.

mod args;

pub use args::Args;

use color_eyre::eyre::{eyre, Result};
use eri::{EriOptions, SphericalOrdering};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub geometry: Vec<Atom>,
    /// NWChem basis library, relative paths resolve against the config file
    pub basis_file: String,
    #[serde(default)]
    pub eri_params: EriParams,
}

/// Atomic position in bohr
#[derive(Debug, Deserialize, Serialize)]
pub struct Atom {
    pub element: String,
    pub coords: [f64; 3],
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EriParams {
    pub screening_threshold: Option<f64>,
    pub pair_threshold: Option<f64>,
    pub schwarz_threshold: Option<f64>,
    pub schwarz: Option<bool>,
    pub ordering: Option<String>,
    pub normalize_cartesian: Option<bool>,
    pub threads: Option<usize>,
}

impl Default for EriParams {
    fn default() -> Self {
        EriParams {
            screening_threshold: Some(1e-12),
            pair_threshold: Some(1e-12),
            schwarz_threshold: Some(1e-12),
            schwarz: Some(true),
            ordering: Some("standard".to_string()),
            normalize_cartesian: Some(true),
            threads: None,
        }
    }
}

impl EriParams {
    /// Apply default values to any missing parameters
    pub fn with_defaults(mut self) -> Self {
        let defaults = Self::default();
        if self.screening_threshold.is_none() {
            self.screening_threshold = defaults.screening_threshold;
        }
        if self.pair_threshold.is_none() {
            self.pair_threshold = defaults.pair_threshold;
        }
        if self.schwarz_threshold.is_none() {
            self.schwarz_threshold = defaults.schwarz_threshold;
        }
        if self.schwarz.is_none() {
            self.schwarz = defaults.schwarz;
        }
        if self.ordering.is_none() {
            self.ordering = defaults.ordering;
        }
        if self.normalize_cartesian.is_none() {
            self.normalize_cartesian = defaults.normalize_cartesian;
        }
        self
    }

    /// Command-line values take precedence over the file.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(t) = args.screening_threshold {
            self.screening_threshold = Some(t);
        }
        if let Some(t) = args.pair_threshold {
            self.pair_threshold = Some(t);
        }
        if let Some(t) = args.schwarz_threshold {
            self.schwarz_threshold = Some(t);
        }
        if args.no_schwarz {
            self.schwarz = Some(false);
        }
        if let Some(ref o) = args.ordering {
            self.ordering = Some(o.clone());
        }
        if args.threads.is_some() {
            self.threads = args.threads;
        }
    }

    pub fn to_options(&self) -> Result<EriOptions> {
        let defaults = EriOptions::default();
        Ok(EriOptions {
            screening_threshold: self.screening_threshold.unwrap_or(defaults.screening_threshold),
            pair_threshold: self.pair_threshold.unwrap_or(defaults.pair_threshold),
            ordering: match self.ordering.as_deref() {
                Some(name) => parse_ordering(name)?,
                None => defaults.ordering,
            },
            normalize_cartesian: self.normalize_cartesian.unwrap_or(defaults.normalize_cartesian),
        })
    }

    /// Schwarz threshold of the batch fill, `None` when screening is off.
    pub fn schwarz_threshold(&self) -> Option<f64> {
        match self.schwarz {
            Some(false) => None,
            _ => self.schwarz_threshold,
        }
    }
}

pub fn parse_ordering(name: &str) -> Result<SphericalOrdering> {
    match name.to_lowercase().as_str() {
        "standard" => Ok(SphericalOrdering::Standard),
        "gaussian" => Ok(SphericalOrdering::Gaussian),
        _ => Err(eyre!("Unknown spherical ordering: {} (expected standard or gaussian)", name)),
    }
}

impl Config {
    pub fn with_defaults(mut self) -> Self {
        self.eri_params = self.eri_params.with_defaults();
        self
    }
}
