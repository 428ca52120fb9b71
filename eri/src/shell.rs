//! Conversion of basis-set shells into the primitive-level shells the
//! integral kernel consumes.

use crate::error::{EriError, Result};
use basis::helper::{double_factorial, n_cartesian};
use basis::BasisShell;
use nalgebra::Vector3;
use std::f64::consts::PI;

/// Highest angular momentum handled by the integral pipeline (k functions).
pub const MAX_AM: usize = 7;

/// One generalized contraction of a basis shell: a single angular momentum
/// with its own coefficient column.
#[derive(Debug, Clone, PartialEq)]
pub struct Shell {
    pub am: usize,
    pub center: Vector3<f64>,
    pub exponents: Vec<f64>,
    pub coefficients: Vec<f64>,
}

impl Shell {
    /// Builds a shell from raw data. Coefficients are used as given; call
    /// [`Shell::normalize`] to apply the primitive and contraction norms.
    pub fn new(am: usize, center: Vector3<f64>, exponents: Vec<f64>, coefficients: Vec<f64>) -> Self {
        debug_assert_eq!(exponents.len(), coefficients.len());
        debug_assert!(!exponents.is_empty());
        Self {
            am,
            center,
            exponents,
            coefficients,
        }
    }

    pub fn n_primitives(&self) -> usize {
        self.exponents.len()
    }

    pub fn n_cartesian(&self) -> usize {
        n_cartesian(self.am)
    }

    /// Normalizes the contraction so that its axial component x^l has unit
    /// self-overlap. Every Cartesian component of the shell carries the same
    /// factor; the component-dependent part is left to the transform.
    pub fn normalize(&mut self) {
        let l = self.am as i32;
        let dfact = double_factorial(2 * l - 1);

        for (c, &a) in self.coefficients.iter_mut().zip(&self.exponents) {
            let norm2 = (2.0 * a / PI).powf(1.5) * (4.0 * a).powi(l) / dfact;
            *c *= norm2.sqrt();
        }

        let mut overlap = 0.0;
        for (ci, ai) in self.coefficients.iter().zip(&self.exponents) {
            for (cj, aj) in self.coefficients.iter().zip(&self.exponents) {
                let p = ai + aj;
                overlap += ci * cj * dfact / (2.0 * p).powi(l) * (PI / p).powf(1.5);
            }
        }

        if overlap > 0.0 {
            let scale = overlap.sqrt().recip();
            self.coefficients.iter_mut().for_each(|c| *c *= scale);
        }
    }
}

/// Fails with `UnsupportedAngularMomentum` if any contraction of `shell`
/// is beyond [`MAX_AM`].
pub fn check_am(shell: &BasisShell) -> Result<()> {
    match shell.contractions.iter().map(|c| c.am).find(|&am| am > MAX_AM) {
        Some(am) => Err(EriError::UnsupportedAngularMomentum {
            am,
            max: MAX_AM,
            basis: 0,
            shell: 0,
        }),
        None => Ok(()),
    }
}

/// Converts contraction `igen` of `basis_shell` into a normalized [`Shell`].
///
/// Error locations (`basis`, `shell`) are left at 0; callers that know the
/// position of the shell fill them in with [`EriError::located`].
pub fn convert(basis_shell: &BasisShell, igen: usize) -> Result<Shell> {
    let count = basis_shell.n_general_contractions();
    if igen >= count {
        return Err(EriError::InvalidContraction {
            shell: 0,
            index: igen,
            count,
        });
    }

    let am = basis_shell.general_am(igen);
    if am > MAX_AM {
        return Err(EriError::UnsupportedAngularMomentum {
            am,
            max: MAX_AM,
            basis: 0,
            shell: 0,
        });
    }

    let mut shell = Shell::new(
        am,
        basis_shell.center,
        basis_shell.exponents.clone(),
        basis_shell.coefficients(igen).to_vec(),
    );
    shell.normalize();
    Ok(shell)
}

impl EriError {
    /// Attaches the basis-set position and shell index to conversion errors.
    pub fn located(self, basis_position: usize, shell_index: usize) -> Self {
        match self {
            EriError::UnsupportedAngularMomentum { am, max, .. } => EriError::UnsupportedAngularMomentum {
                am,
                max,
                basis: basis_position,
                shell: shell_index,
            },
            EriError::InvalidContraction { index, count, .. } => EriError::InvalidContraction {
                shell: shell_index,
                index,
                count,
            },
            other => other,
        }
    }
}
