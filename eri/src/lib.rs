//! Four-center electron repulsion integrals over contracted Gaussian shells.
//!
//! An [`EriEvaluator`] is built once for four basis sets and then evaluates
//! shell quartets without further allocation. Converted shells and shell-pair
//! tables are shared between equal basis sets, between the bra and ket sides,
//! and optionally between evaluators through a [`PairTableCache`].

pub mod buffers;
pub mod config;
pub mod driver;
pub mod error;
pub mod evaluator;
pub mod kernel;
pub mod pair;
pub mod shell;
pub mod table;
pub mod transform;

#[cfg(test)]
mod evaluator_test;

pub use buffers::{BufferSizes, ScratchBuffers};
pub use config::{EriOptions, SphericalOrdering};
pub use driver::{fill_tensor, SchwarzBounds, TensorFill};
pub use error::{EriError, Result};
pub use evaluator::{cache_key, EriBuilder, EriEvaluator};
pub use kernel::{McMurchieDavidson, PrimitiveKernel};
pub use pair::ShellPair;
pub use shell::{convert, Shell, MAX_AM};
pub use table::{PairTableCache, ShellPairTable, ShellVec, TableSet};

/// Builds the process-wide Boys function grid and solid harmonic tables.
/// Safe to call from any thread, any number of times.
pub fn init() {
    kernel::boys::table();
    transform::init_tables();
}
