pub mod boys;
pub mod mcmurchie;

pub use mcmurchie::McMurchieDavidson;

use crate::pair::ShellPair;

/// Computes contracted Cartesian integrals (ab|cd) of one bra pair and one
/// ket pair.
///
/// Implementations write the block row-major over the Cartesian components
/// of a, b, c and d (d fastest) at the start of `out` and return the number
/// of blocks written. A return value of 0 means the whole quartet was
/// screened out and `out` was left untouched.
pub trait PrimitiveKernel: Send + Sync {
    /// Scratch length needed for quartets up to these angular momenta and
    /// primitive counts, one entry per basis-set position.
    fn work_len(&self, max_am: [usize; 4], max_nprim: [usize; 4]) -> usize;

    fn compute(&self, bra: &ShellPair, ket: &ShellPair, tolerance: f64, work: &mut [f64], out: &mut [f64]) -> usize;
}
