//! Basis-set model consumed by the integral code: shells with generalized
//! contractions, whole-molecule basis sets with identity hashing, and NWChem
//! / JSON loading.

pub mod basis;
pub mod cgto;
pub mod helper;
pub mod library;


pub use basis::BasisSet;
pub use cgto::{BasisShell, Contraction, ShellType};
pub use library::BasisLibrary;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BasisError {
    #[error("Shell has no primitives or no contractions")]
    EmptyShell,

    #[error("Contraction has {found} coefficients but the shell has {expected} primitives")]
    CoefficientCount { expected: usize, found: usize },

    #[error("Primitive exponent must be positive, found {0}")]
    InvalidExponent(f64),

    #[error("Unknown element symbol '{0}'")]
    UnknownElement(String),

    #[error("Unknown shell label '{0}'")]
    UnknownShell(String),

    #[error("Basis library has no entry for element '{0}'")]
    MissingElement(String),

    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Unable to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
