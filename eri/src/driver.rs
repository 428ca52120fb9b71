//! Whole-tensor drivers on top of [`EriEvaluator`]: Cauchy-Schwarz shell-pair
//! bounds and a parallel fill of the four-index integral tensor.
//!
//! Both fan out over the shells of the first index with rayon, giving every
//! worker its own forked evaluator. Each worker writes the contiguous slab of
//! the output that belongs to its first-index shell, so no two workers touch
//! the same memory.

use crate::error::Result;
use crate::evaluator::{EriBuilder, EriEvaluator};
use basis::BasisSet;
use itertools::iproduct;
use rayon::prelude::*;
use std::sync::Arc;

/// Split `data` into consecutive chunks of the given lengths.
fn split_slabs<'a>(mut data: &'a mut [f64], lengths: impl Iterator<Item = usize>) -> Vec<&'a mut [f64]> {
    let mut slabs = Vec::new();
    for len in lengths {
        let (head, tail) = std::mem::take(&mut data).split_at_mut(len);
        slabs.push(head);
        data = tail;
    }
    slabs
}

/// sqrt(max |(ij|ij)|) for every shell pair of `a` x `b`, row-major.
fn pair_bounds(builder: &EriBuilder, a: &Arc<BasisSet>, b: &Arc<BasisSet>) -> Result<Vec<f64>> {
    let base = builder.initialize(0, [a.clone(), b.clone(), a.clone(), b.clone()])?;
    let n_b = b.len();
    let mut values = vec![0.0; a.len() * n_b];

    split_slabs(&mut values, (0..a.len()).map(|_| n_b))
        .into_par_iter()
        .enumerate()
        .map_init(
            || base.fork(),
            |ev, (i, row)| -> Result<()> {
                for (j, slot) in row.iter_mut().enumerate() {
                    let [ni, nj, _, _] = ev.function_counts(i, j, i, j)?;
                    let block = ev.evaluate(i, j, i, j)?;
                    let max = iproduct!(0..ni, 0..nj)
                        .map(|(p, q)| block[((p * nj + q) * ni + p) * nj + q].abs())
                        .fold(0.0, f64::max);
                    *slot = max.sqrt();
                }
                Ok(())
            },
        )
        .collect::<Result<Vec<()>>>()?;

    Ok(values)
}

/// Cauchy-Schwarz bounds of the bra and ket shell pairs of an evaluator.
#[derive(Debug, Clone, PartialEq)]
pub struct SchwarzBounds {
    dims: [usize; 4],
    bra: Vec<f64>,
    ket: Vec<f64>,
    pub threshold: f64,
}

impl SchwarzBounds {
    pub fn compute(evaluator: &EriEvaluator, threshold: f64) -> Result<Self> {
        let builder = evaluator.builder();
        let [a, b, c, d] = evaluator.basis_sets();
        let bra = pair_bounds(&builder, a, b)?;
        let ket = if **a == **c && **b == **d {
            bra.clone()
        } else {
            pair_bounds(&builder, c, d)?
        };
        tracing::debug!(
            "Schwarz bounds: {} bra pairs, {} ket pairs, threshold {:e}",
            bra.len(),
            ket.len(),
            threshold
        );
        Ok(Self {
            dims: [a.len(), b.len(), c.len(), d.len()],
            bra,
            ket,
            threshold,
        })
    }

    pub fn bra_bound(&self, i: usize, j: usize) -> f64 {
        self.bra[i * self.dims[1] + j]
    }

    pub fn ket_bound(&self, k: usize, l: usize) -> f64 {
        self.ket[k * self.dims[3] + l]
    }

    /// False when (ij|kl) is guaranteed to be below the threshold.
    #[inline]
    pub fn passes(&self, i: usize, j: usize, k: usize, l: usize) -> bool {
        self.bra_bound(i, j) * self.ket_bound(k, l) >= self.threshold
    }
}

/// The full integral tensor over the four basis sets of an evaluator.
#[derive(Debug, Clone)]
pub struct TensorFill {
    /// Number of basis functions at each index.
    pub dims: [usize; 4],
    /// Row-major values, last index fastest.
    pub values: Vec<f64>,
    pub computed: usize,
    pub screened: usize,
}

impl TensorFill {
    pub fn get(&self, p: usize, q: usize, r: usize, s: usize) -> f64 {
        let [_, n2, n3, n4] = self.dims;
        self.values[((p * n2 + q) * n3 + r) * n4 + s]
    }
}

/// Evaluates every shell quartet in parallel and scatters the blocks into
/// one dense tensor. Quartets rejected by `schwarz` are left at zero.
pub fn fill_tensor(evaluator: &EriEvaluator, schwarz: Option<&SchwarzBounds>) -> Result<TensorFill> {
    let bases = evaluator.basis_sets();
    let offsets = bases.each_ref().map(|b| b.shell_offsets());
    let dims = bases.each_ref().map(|b| b.n_functions());
    let nshell = bases.each_ref().map(|b| b.len());
    let plane = dims[1] * dims[2] * dims[3];

    let mut values = vec![0.0; dims.iter().product()];
    let slab_lengths = offsets[0].windows(2).map(|w| (w[1] - w[0]) * plane);

    let counts = split_slabs(&mut values, slab_lengths)
        .into_par_iter()
        .enumerate()
        .map_init(
            || evaluator.fork(),
            |ev, (i, slab)| -> Result<(usize, usize)> {
                let (mut computed, mut screened) = (0, 0);
                for (j, k, l) in iproduct!(0..nshell[1], 0..nshell[2], 0..nshell[3]) {
                    if schwarz.is_some_and(|s| !s.passes(i, j, k, l)) {
                        screened += 1;
                        continue;
                    }
                    let [n1, n2, n3, n4] = ev.function_counts(i, j, k, l)?;
                    let block = ev.evaluate(i, j, k, l)?;
                    for (p, q, r) in iproduct!(0..n1, 0..n2, 0..n3) {
                        let src = ((p * n2 + q) * n3 + r) * n4;
                        let dst = ((p * dims[1] + offsets[1][j] + q) * dims[2] + offsets[2][k] + r) * dims[3]
                            + offsets[3][l];
                        slab[dst..dst + n4].copy_from_slice(&block[src..src + n4]);
                    }
                    computed += 1;
                }
                Ok((computed, screened))
            },
        )
        .collect::<Result<Vec<_>>>()?;

    let (computed, screened) = counts
        .into_iter()
        .fold((0, 0), |(c, s), (ci, si)| (c + ci, s + si));
    tracing::debug!(
        "Filled {:?} integral tensor: {} quartets computed, {} screened",
        dims,
        computed,
        screened
    );

    Ok(TensorFill {
        dims,
        values,
        computed,
        screened,
    })
}
