/* Contracted Gaussian shells with generalized contractions.

   A shell shares one set of primitive exponents and one center between
   one or more contractions, each with its own angular momentum and
   coefficient column (SP shells are the common example).
*/

use crate::helper::{n_cartesian, n_spherical};
use crate::BasisError;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Whether the functions of a shell are real solid harmonics or Cartesian
/// Gaussians.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ShellType {
    #[default]
    Spherical,
    Cartesian,
}

/// One coefficient column of a generalized contraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contraction {
    pub am: usize,
    // stored un-normalized, as read from the basis-set file
    pub coefficients: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasisShell {
    pub center: Vector3<f64>,
    pub exponents: Vec<f64>,
    pub contractions: Vec<Contraction>,
    #[serde(default)]
    pub shell_type: ShellType,
}

impl BasisShell {
    /// Builds a shell, checking that every contraction has one coefficient
    /// per primitive.
    pub fn new(
        center: Vector3<f64>,
        exponents: Vec<f64>,
        contractions: Vec<Contraction>,
        shell_type: ShellType,
    ) -> Result<Self, BasisError> {
        if exponents.is_empty() || contractions.is_empty() {
            return Err(BasisError::EmptyShell);
        }
        for c in &contractions {
            if c.coefficients.len() != exponents.len() {
                return Err(BasisError::CoefficientCount {
                    expected: exponents.len(),
                    found: c.coefficients.len(),
                });
            }
        }
        if let Some(&alpha) = exponents.iter().find(|a| !(**a > 0.0)) {
            return Err(BasisError::InvalidExponent(alpha));
        }

        Ok(Self {
            center,
            exponents,
            contractions,
            shell_type,
        })
    }

    /// Single-contraction shell.
    pub fn segmented(
        am: usize,
        center: Vector3<f64>,
        exponents: Vec<f64>,
        coefficients: Vec<f64>,
        shell_type: ShellType,
    ) -> Result<Self, BasisError> {
        Self::new(
            center,
            exponents,
            vec![Contraction { am, coefficients }],
            shell_type,
        )
    }

    pub fn n_primitives(&self) -> usize {
        self.exponents.len()
    }

    pub fn n_general_contractions(&self) -> usize {
        self.contractions.len()
    }

    pub fn general_am(&self, igen: usize) -> usize {
        self.contractions[igen].am
    }

    pub fn coefficients(&self, igen: usize) -> &[f64] {
        &self.contractions[igen].coefficients
    }

    pub fn max_am(&self) -> usize {
        self.contractions.iter().map(|c| c.am).max().unwrap_or(0)
    }

    pub fn is_spherical(&self) -> bool {
        self.shell_type == ShellType::Spherical
    }

    /// Number of basis functions contributed by one contraction.
    pub fn general_n_functions(&self, igen: usize) -> usize {
        let l = self.general_am(igen);
        match self.shell_type {
            ShellType::Spherical => n_spherical(l),
            ShellType::Cartesian => n_cartesian(l),
        }
    }

    /// Number of basis functions of the whole shell.
    pub fn n_functions(&self) -> usize {
        (0..self.n_general_contractions())
            .map(|g| self.general_n_functions(g))
            .sum()
    }

    /// Number of Cartesian Gaussians of the whole shell, whatever its type.
    pub fn n_cartesian(&self) -> usize {
        self.contractions.iter().map(|c| n_cartesian(c.am)).sum()
    }

    pub fn with_center(mut self, center: Vector3<f64>) -> Self {
        self.center = center;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sp_shell() -> BasisShell {
        BasisShell::new(
            Vector3::new(0.0, 0.0, 1.0),
            vec![5.0, 1.0],
            vec![
                Contraction { am: 0, coefficients: vec![0.3, 0.7] },
                Contraction { am: 1, coefficients: vec![0.4, 0.6] },
            ],
            ShellType::Spherical,
        )
        .unwrap()
    }

    #[test]
    fn test_sp_shell_counts() {
        let sh = sp_shell();
        assert_eq!(sh.n_primitives(), 2);
        assert_eq!(sh.n_general_contractions(), 2);
        assert_eq!(sh.max_am(), 1);
        assert_eq!(sh.n_functions(), 4);
        assert_eq!(sh.n_cartesian(), 4);
    }

    #[test]
    fn test_cartesian_d_counts() {
        let sh = BasisShell::segmented(2, Vector3::zeros(), vec![1.0], vec![1.0], ShellType::Cartesian)
            .unwrap();
        assert_eq!(sh.n_functions(), 6);
        let sh = BasisShell { shell_type: ShellType::Spherical, ..sh };
        assert_eq!(sh.n_functions(), 5);
    }

    #[test]
    fn test_rejects_mismatched_coefficients() {
        let err = BasisShell::segmented(0, Vector3::zeros(), vec![1.0, 2.0], vec![1.0], ShellType::Spherical)
            .unwrap_err();
        assert!(matches!(err, BasisError::CoefficientCount { expected: 2, found: 1 }));
    }

    #[test]
    fn test_rejects_empty_and_negative() {
        assert!(matches!(
            BasisShell::new(Vector3::zeros(), vec![], vec![], ShellType::Spherical),
            Err(BasisError::EmptyShell)
        ));
        assert!(matches!(
            BasisShell::segmented(0, Vector3::zeros(), vec![-1.0], vec![1.0], ShellType::Spherical),
            Err(BasisError::InvalidExponent(_))
        ));
    }
}
