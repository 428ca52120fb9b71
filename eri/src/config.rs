use serde::{Deserialize, Serialize};

/// Order of the 2l+1 real solid harmonics within a spherical shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SphericalOrdering {
    /// m = -l, ..., 0, ..., +l
    #[default]
    Standard,
    /// m = 0, +1, -1, +2, -2, ..., +l, -l
    Gaussian,
}

impl SphericalOrdering {
    /// Position of component `m` within a shell of angular momentum `l`.
    pub fn position(self, l: usize, m: i32) -> usize {
        match self {
            SphericalOrdering::Standard => (m + l as i32) as usize,
            SphericalOrdering::Gaussian => match m {
                0 => 0,
                m if m > 0 => (2 * m - 1) as usize,
                m => (-2 * m) as usize,
            },
        }
    }
}

/// Tunable parameters of an evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EriOptions {
    /// Tolerance handed to the primitive kernel; primitive quartets whose
    /// bound falls below it are skipped. 0 disables screening.
    ///
    /// The pair bound is the s-type `(ab|ab)` estimate. It is rigorous for
    /// s shells only and a heuristic for l > 0, where skipped contributions
    /// may slightly exceed the tolerance.
    pub screening_threshold: f64,
    /// Shell pairs whose bound falls below this value are flagged negligible.
    pub pair_threshold: f64,
    pub ordering: SphericalOrdering,
    /// Rescale every component of a Cartesian shell to unit self-overlap.
    /// When false all components share the normalization of x^l.
    pub normalize_cartesian: bool,
}

impl Default for EriOptions {
    fn default() -> Self {
        Self {
            screening_threshold: 0.0,
            pair_threshold: 0.0,
            ordering: SphericalOrdering::Standard,
            normalize_cartesian: true,
        }
    }
}
