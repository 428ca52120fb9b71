use crate::error::{EriError, Result};
use crate::kernel::PrimitiveKernel;
use crate::shell::MAX_AM;
use crate::table::ShellVec;
use basis::helper::n_cartesian;
use basis::BasisSet;

/// Lengths of the four scratch regions of an evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferSizes {
    pub kernel: usize,
    pub cartesian: usize,
    pub transform: usize,
    pub spherical: usize,
    /// Largest number of contraction combinations in one quartet.
    pub combinations: usize,
}

impl BufferSizes {
    /// Sizes large enough for any quartet over the four basis sets.
    pub fn size_for(kernel: &dyn PrimitiveKernel, bases: [&BasisSet; 4]) -> Result<Self> {
        for (position, basis) in bases.iter().enumerate() {
            if let Some((shell, am)) = basis
                .shells()
                .iter()
                .map(|sh| sh.max_am())
                .enumerate()
                .find(|&(_, am)| am > MAX_AM)
            {
                return Err(EriError::UnsupportedAngularMomentum {
                    am,
                    max: MAX_AM,
                    basis: position,
                    shell,
                });
            }
        }

        let max_am = bases.map(|b| b.max_am());
        let max_nprim = bases.map(|b| b.max_n_primitives());

        Ok(Self {
            kernel: kernel.work_len(max_am, max_nprim),
            cartesian: bases.iter().map(|b| b.max_n_cartesian()).product(),
            transform: 2 * max_am.iter().map(|&l| n_cartesian(l)).product::<usize>(),
            spherical: bases.iter().map(|b| b.max_n_functions()).product(),
            combinations: bases
                .iter()
                .map(|b| b.max_property(|sh| sh.n_general_contractions()))
                .product(),
        })
    }

    pub fn total(&self) -> usize {
        self.kernel + self.cartesian + self.transform + self.spherical
    }

    /// Checks that the largest quartet over the converted shells fits.
    pub fn verify(&self, shells: [&ShellVec; 4]) -> Result<()> {
        let largest = |f: &dyn Fn(&ShellVec, usize) -> usize| -> usize {
            shells
                .iter()
                .map(|sv| (0..sv.len()).map(|i| f(sv, i)).max().unwrap_or(0))
                .product()
        };

        let cartesian = largest(&|sv, i| sv.layout(i).n_cartesian);
        if cartesian > self.cartesian {
            return Err(EriError::InvariantViolation {
                what: "cartesian buffer",
                required: cartesian,
                available: self.cartesian,
            });
        }
        let spherical = largest(&|sv, i| sv.layout(i).n_functions);
        if spherical > self.spherical {
            return Err(EriError::InvariantViolation {
                what: "spherical buffer",
                required: spherical,
                available: self.spherical,
            });
        }
        let block = largest(&|sv, i| {
            sv.contractions(i)
                .iter()
                .map(|sh| sh.n_cartesian())
                .max()
                .unwrap_or(0)
        });
        if 2 * block > self.transform {
            return Err(EriError::InvariantViolation {
                what: "transform scratch",
                required: 2 * block,
                available: self.transform,
            });
        }
        Ok(())
    }
}

/// One contiguous allocation partitioned into the four scratch regions.
#[derive(Debug, Clone)]
pub struct ScratchBuffers {
    data: Vec<f64>,
    sizes: BufferSizes,
}

/// Disjoint mutable views of the scratch regions.
pub struct ScratchViews<'a> {
    pub kernel: &'a mut [f64],
    pub cartesian: &'a mut [f64],
    pub transform: &'a mut [f64],
    pub spherical: &'a mut [f64],
}

impl ScratchBuffers {
    pub fn allocate(sizes: BufferSizes) -> Self {
        tracing::debug!(
            "Allocating {} scratch values (kernel {}, cartesian {}, transform {}, spherical {})",
            sizes.total(),
            sizes.kernel,
            sizes.cartesian,
            sizes.transform,
            sizes.spherical
        );
        Self {
            data: vec![0.0; sizes.total()],
            sizes,
        }
    }

    pub fn sizes(&self) -> &BufferSizes {
        &self.sizes
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn split(&mut self) -> ScratchViews<'_> {
        let (kernel, rest) = self.data.split_at_mut(self.sizes.kernel);
        let (cartesian, rest) = rest.split_at_mut(self.sizes.cartesian);
        let (transform, spherical) = rest.split_at_mut(self.sizes.transform);
        ScratchViews {
            kernel,
            cartesian,
            transform,
            spherical,
        }
    }

    pub fn cartesian(&self) -> &[f64] {
        let start = self.sizes.kernel;
        &self.data[start..start + self.sizes.cartesian]
    }

    pub fn spherical(&self) -> &[f64] {
        &self.data[self.sizes.total() - self.sizes.spherical..]
    }
}
