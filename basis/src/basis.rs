use crate::cgto::BasisShell;
use crate::BasisError;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::hash::Hasher;
use std::path::Path;

/// An ordered collection of shells, usually spanning a whole molecule.
///
/// Two basis sets are equal when their shell data are equal; the name is a
/// label only and does not take part in comparisons or in the identity hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasisSet {
    pub name: String,
    pub shells: Vec<BasisShell>,
}

/// Bit pattern with -0.0 folded onto 0.0, so values equal under `==` hash alike.
fn canonical_bits(x: f64) -> u64 {
    (x + 0.0).to_bits()
}

impl PartialEq for BasisSet {
    fn eq(&self, other: &Self) -> bool {
        self.shells == other.shells
    }
}

impl BasisSet {
    pub fn new(name: impl Into<String>, shells: Vec<BasisShell>) -> Self {
        Self {
            name: name.into(),
            shells,
        }
    }

    pub fn len(&self) -> usize {
        self.shells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shells.is_empty()
    }

    pub fn shell(&self, i: usize) -> &BasisShell {
        &self.shells[i]
    }

    pub fn shells(&self) -> &[BasisShell] {
        &self.shells
    }

    /// Largest value of `f` over all shells, 0 for an empty set.
    pub fn max_property<F>(&self, f: F) -> usize
    where
        F: Fn(&BasisShell) -> usize,
    {
        self.shells.iter().map(f).max().unwrap_or(0)
    }

    pub fn max_am(&self) -> usize {
        self.max_property(BasisShell::max_am)
    }

    /// Every angular momentum present in any contraction.
    pub fn all_am(&self) -> BTreeSet<usize> {
        self.shells
            .iter()
            .flat_map(|sh| sh.contractions.iter().map(|c| c.am))
            .collect()
    }

    pub fn max_n_primitives(&self) -> usize {
        self.max_property(BasisShell::n_primitives)
    }

    pub fn max_n_functions(&self) -> usize {
        self.max_property(BasisShell::n_functions)
    }

    pub fn max_n_cartesian(&self) -> usize {
        self.max_property(BasisShell::n_cartesian)
    }

    pub fn n_functions(&self) -> usize {
        self.shells.iter().map(BasisShell::n_functions).sum()
    }

    /// Index of the first basis function of every shell, with the total
    /// function count appended.
    pub fn shell_offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.shells.len() + 1);
        let mut acc = 0;
        offsets.push(acc);
        for sh in &self.shells {
            acc += sh.n_functions();
            offsets.push(acc);
        }
        offsets
    }

    /// Deterministic hash of the shell data, consistent with `==`.
    pub fn identity_hash(&self) -> u64 {
        let mut h = FxHasher::default();
        h.write_usize(self.shells.len());
        for sh in &self.shells {
            for x in sh.center.iter() {
                h.write_u64(canonical_bits(*x));
            }
            h.write_u8(sh.shell_type as u8);
            h.write_usize(sh.exponents.len());
            for a in &sh.exponents {
                h.write_u64(canonical_bits(*a));
            }
            h.write_usize(sh.contractions.len());
            for c in &sh.contractions {
                h.write_usize(c.am);
                for x in &c.coefficients {
                    h.write_u64(canonical_bits(*x));
                }
            }
        }
        h.finish()
    }

    /// Identity hash formatted as 16 hex digits.
    pub fn hash_string(&self) -> String {
        format!("{:016x}", self.identity_hash())
    }

    pub fn from_json(s: &str) -> Result<Self, BasisError> {
        let basis: BasisSet = serde_json::from_str(s)?;
        for sh in &basis.shells {
            // re-run the constructor checks on deserialized data
            BasisShell::new(
                sh.center,
                sh.exponents.clone(),
                sh.contractions.clone(),
                sh.shell_type,
            )?;
        }
        Ok(basis)
    }

    pub fn to_json(&self) -> Result<String, BasisError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, BasisError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| BasisError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), BasisError> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?).map_err(|source| BasisError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}
