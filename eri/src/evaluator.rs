//! Quartet evaluation: pair lookup, the kernel loop over contraction
//! combinations, and the final Cartesian to spherical pass.

use crate::buffers::{BufferSizes, ScratchBuffers};
use crate::config::EriOptions;
use crate::error::{EriError, Result};
use crate::kernel::{McMurchieDavidson, PrimitiveKernel};
use crate::table::{PairTableCache, ShellPairTable, TableSet};
use crate::transform::Transformer;
use basis::helper::n_cartesian;
use basis::BasisSet;
use itertools::iproduct;
use std::sync::Arc;

/// Key identifying an evaluator configuration: the identity hashes of the
/// four basis sets followed by the derivative order.
pub fn cache_key(derivative_order: u32, bases: [&BasisSet; 4]) -> String {
    let mut key = String::with_capacity(4 * 16 + 2);
    for basis in bases {
        key.push_str(&basis.hash_string());
    }
    key.push_str(&derivative_order.to_string());
    key
}

/// Collects the kernel, options and optional shared cache an evaluator is
/// built from.
#[derive(Clone)]
pub struct EriBuilder {
    kernel: Arc<dyn PrimitiveKernel>,
    options: EriOptions,
    cache: Option<Arc<PairTableCache>>,
}

impl Default for EriBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EriBuilder {
    /// Builder using the McMurchie-Davidson kernel and default options.
    pub fn new() -> Self {
        Self::with_kernel(Arc::new(McMurchieDavidson::new()))
    }

    pub fn with_kernel(kernel: Arc<dyn PrimitiveKernel>) -> Self {
        Self {
            kernel,
            options: EriOptions::default(),
            cache: None,
        }
    }

    pub fn options(mut self, options: EriOptions) -> Self {
        self.options = options;
        self
    }

    pub fn cache(mut self, cache: Arc<PairTableCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Converts the four basis sets, builds the pair tables and allocates
    /// all scratch memory. Only derivative order 0 is supported.
    pub fn initialize(&self, derivative_order: u32, bases: [Arc<BasisSet>; 4]) -> Result<EriEvaluator> {
        if derivative_order != 0 {
            return Err(EriError::NotImplemented { derivative_order });
        }
        crate::init();

        let tables = TableSet::build(&bases, self.options.pair_threshold, self.cache.as_deref())?;
        let sizes = BufferSizes::size_for(
            self.kernel.as_ref(),
            [&*bases[0], &*bases[1], &*bases[2], &*bases[3]],
        )?;
        sizes.verify([
            &*tables.shells[0],
            &*tables.shells[1],
            &*tables.shells[2],
            &*tables.shells[3],
        ])?;

        tracing::debug!(
            "Initialized ERI evaluator: {} unique basis sets, bra/ket tables shared: {}, {} scratch values",
            tables.n_unique_shells(),
            Arc::ptr_eq(&tables.bra, &tables.ket),
            sizes.total()
        );

        Ok(EriEvaluator {
            kernel: self.kernel.clone(),
            transformer: Transformer::new(&self.options),
            options: self.options,
            derivative_order,
            bases,
            tables,
            buffers: ScratchBuffers::allocate(sizes),
            block_offsets: Vec::with_capacity(sizes.combinations),
        })
    }
}

/// Evaluates shell quartets over four fixed basis sets.
///
/// All memory is allocated up front; the slice returned by
/// [`EriEvaluator::evaluate`] borrows the internal output buffer and is
/// overwritten by the next call.
pub struct EriEvaluator {
    kernel: Arc<dyn PrimitiveKernel>,
    options: EriOptions,
    transformer: Transformer,
    derivative_order: u32,
    bases: [Arc<BasisSet>; 4],
    tables: TableSet,
    buffers: ScratchBuffers,
    block_offsets: Vec<usize>,
}

impl EriEvaluator {
    /// Number of basis functions of each shell of the quartet.
    pub fn function_counts(&self, s1: usize, s2: usize, s3: usize, s4: usize) -> Result<[usize; 4]> {
        let idx = [s1, s2, s3, s4];
        let mut counts = [0; 4];
        for (position, (&index, sv)) in idx.iter().zip(&self.tables.shells).enumerate() {
            if index >= sv.len() {
                return Err(EriError::ShellIndexOutOfRange {
                    position,
                    index,
                    len: sv.len(),
                });
            }
            counts[position] = sv.layout(index).n_functions;
        }
        Ok(counts)
    }

    /// Integrals of one shell quartet, row-major over the functions of
    /// s1, s2, s3, s4 with the s4 index fastest.
    pub fn evaluate(&mut self, s1: usize, s2: usize, s3: usize, s4: usize) -> Result<&[f64]> {
        let (n, passthrough) = self.compute([s1, s2, s3, s4])?;
        let values = if passthrough {
            &self.buffers.cartesian()[..n]
        } else {
            &self.buffers.spherical()[..n]
        };
        Ok(values)
    }

    /// Like [`EriEvaluator::evaluate`] but copies into `out`; returns the
    /// number of values written.
    pub fn evaluate_into(&mut self, s1: usize, s2: usize, s3: usize, s4: usize, out: &mut [f64]) -> Result<usize> {
        let required: usize = self.function_counts(s1, s2, s3, s4)?.iter().product();
        if out.len() < required {
            return Err(EriError::BufferTooSmall {
                required,
                supplied: out.len(),
            });
        }
        let values = self.evaluate(s1, s2, s3, s4)?;
        out[..required].copy_from_slice(values);
        Ok(required)
    }

    fn compute(&mut self, idx: [usize; 4]) -> Result<(usize, bool)> {
        let counts = self.function_counts(idx[0], idx[1], idx[2], idx[3])?;
        let total: usize = counts.iter().product();

        let shells = &self.tables.shells;
        let layouts = [
            shells[0].layout(idx[0]),
            shells[1].layout(idx[1]),
            shells[2].layout(idx[2]),
            shells[3].layout(idx[3]),
        ];
        let ngen = layouts.map(|l| l.contractions.len());
        let bra_table = &self.tables.bra;
        let ket_table = &self.tables.ket;
        let views = self.buffers.split();
        let cartesian = views.cartesian;

        self.block_offsets.clear();
        let mut cursor = 0;
        for (g1, g2, g3, g4) in iproduct!(0..ngen[0], 0..ngen[1], 0..ngen[2], 0..ngen[3]) {
            let bra = bra_table.pair(idx[0], idx[1], g1, g2);
            let ket = ket_table.pair(idx[2], idx[3], g3, g4);
            let block = n_cartesian(bra.am[0]) * n_cartesian(bra.am[1]) * n_cartesian(ket.am[0]) * n_cartesian(ket.am[1]);
            if cursor + block > cartesian.len() {
                return Err(EriError::InvariantViolation {
                    what: "cartesian buffer",
                    required: cursor + block,
                    available: cartesian.len(),
                });
            }

            let written = self.kernel.compute(
                bra,
                ket,
                self.options.screening_threshold,
                views.kernel,
                &mut cartesian[cursor..],
            );
            self.block_offsets.push(cursor);

            let advance = written.max(1) * block;
            if cursor + advance > cartesian.len() {
                return Err(EriError::InvariantViolation {
                    what: "cartesian buffer",
                    required: cursor + advance,
                    available: cartesian.len(),
                });
            }
            if written == 0 {
                cartesian[cursor..cursor + block].fill(0.0);
            }
            cursor += advance;
        }

        if self.transformer.is_passthrough(layouts) {
            return Ok((total, true));
        }

        let n = self.transformer.transform(
            layouts,
            cartesian,
            &self.block_offsets,
            views.transform,
            views.spherical,
        )?;
        Ok((n, false))
    }

    /// A new evaluator over the same tables with its own scratch memory.
    pub fn fork(&self) -> EriEvaluator {
        let sizes = *self.buffers.sizes();
        EriEvaluator {
            kernel: self.kernel.clone(),
            options: self.options,
            transformer: self.transformer,
            derivative_order: self.derivative_order,
            bases: self.bases.clone(),
            tables: self.tables.clone(),
            buffers: ScratchBuffers::allocate(sizes),
            block_offsets: Vec::with_capacity(sizes.combinations),
        }
    }

    /// A builder with the kernel and options of this evaluator.
    pub fn builder(&self) -> EriBuilder {
        EriBuilder::with_kernel(self.kernel.clone()).options(self.options)
    }

    pub fn cache_key(&self) -> String {
        cache_key(
            self.derivative_order,
            [&*self.bases[0], &*self.bases[1], &*self.bases[2], &*self.bases[3]],
        )
    }

    pub fn basis_sets(&self) -> &[Arc<BasisSet>; 4] {
        &self.bases
    }

    pub fn bra_table(&self) -> &Arc<ShellPairTable> {
        &self.tables.bra
    }

    pub fn ket_table(&self) -> &Arc<ShellPairTable> {
        &self.tables.ket
    }

    pub fn tables(&self) -> &TableSet {
        &self.tables
    }

    pub fn sizes(&self) -> &BufferSizes {
        self.buffers.sizes()
    }

    pub fn options(&self) -> &EriOptions {
        &self.options
    }

    pub fn derivative_order(&self) -> u32 {
        self.derivative_order
    }
}
