//! Converted shells and dense shell-pair tables, shared between the four
//! basis-set positions of an evaluator (and between evaluators through a
//! [`PairTableCache`]).

use crate::error::Result;
use crate::pair::ShellPair;
use crate::shell::{check_am, convert, Shell};
use crate::transform::ShellLayout;
use basis::BasisSet;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Every shell of a basis set converted once, one [`Shell`] per generalized
/// contraction.
#[derive(Debug)]
pub struct ShellVec {
    basis: Arc<BasisSet>,
    shells: Vec<Vec<Shell>>,
    layouts: Vec<ShellLayout>,
}

impl ShellVec {
    /// Converts all shells of `basis`. `position` (0..4) only labels errors.
    pub fn build(basis: Arc<BasisSet>, position: usize) -> Result<Self> {
        let mut shells = Vec::with_capacity(basis.len());
        let mut layouts = Vec::with_capacity(basis.len());
        for (i, bs) in basis.shells().iter().enumerate() {
            check_am(bs).map_err(|e| e.located(position, i))?;
            let converted = (0..bs.n_general_contractions())
                .map(|g| convert(bs, g).map_err(|e| e.located(position, i)))
                .collect::<Result<Vec<_>>>()?;
            shells.push(converted);
            layouts.push(ShellLayout::from_basis_shell(bs));
        }
        Ok(Self {
            basis,
            shells,
            layouts,
        })
    }

    pub fn basis(&self) -> &Arc<BasisSet> {
        &self.basis
    }

    pub fn len(&self) -> usize {
        self.shells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shells.is_empty()
    }

    /// Converted contractions of basis shell `i`.
    pub fn contractions(&self, i: usize) -> &[Shell] {
        &self.shells[i]
    }

    pub fn layout(&self, i: usize) -> &ShellLayout {
        &self.layouts[i]
    }
}

/// Dense table of shell pairs over (shell of A) x (shell of B).
///
/// Entry `a * n_b + b` holds the pairs of every contraction combination of
/// the two shells, first contraction index major. Pairs whose bound falls
/// below the threshold stay in the table with their `negligible` flag set.
#[derive(Debug)]
pub struct ShellPairTable {
    shells: [Arc<ShellVec>; 2],
    n_b: usize,
    starts: Vec<usize>,
    pairs: Vec<ShellPair>,
    threshold: f64,
}

impl ShellPairTable {
    pub fn build(a: Arc<ShellVec>, b: Arc<ShellVec>, threshold: f64) -> Self {
        let (n_a, n_b) = (a.len(), b.len());
        let entries: Vec<Vec<ShellPair>> = (0..n_a * n_b)
            .into_par_iter()
            .map(|ab| {
                let (ia, ib) = (ab / n_b, ab % n_b);
                let mut entry = Vec::new();
                for sa in a.contractions(ia) {
                    for sb in b.contractions(ib) {
                        entry.push(ShellPair::new(sa, sb, threshold));
                    }
                }
                entry
            })
            .collect();

        let mut starts = Vec::with_capacity(entries.len() + 1);
        starts.push(0);
        for e in &entries {
            starts.push(starts[starts.len() - 1] + e.len());
        }
        let pairs: Vec<ShellPair> = entries.into_iter().flatten().collect();

        let table = Self {
            shells: [a, b],
            n_b,
            starts,
            pairs,
            threshold,
        };
        tracing::debug!(
            "Built shell-pair table {}x{}: {} pairs, {} negligible",
            n_a,
            n_b,
            table.pairs.len(),
            table.n_negligible()
        );
        table
    }

    pub fn shells(&self) -> [&Arc<ShellVec>; 2] {
        [&self.shells[0], &self.shells[1]]
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.shells[0].len(), self.n_b)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// All pairs of basis shells `a` and `b`.
    pub fn entry(&self, a: usize, b: usize) -> &[ShellPair] {
        let k = a * self.n_b + b;
        &self.pairs[self.starts[k]..self.starts[k + 1]]
    }

    /// Pair of contraction `ga` of shell `a` with contraction `gb` of shell `b`.
    pub fn pair(&self, a: usize, b: usize, ga: usize, gb: usize) -> &ShellPair {
        let n_gb = self.shells[1].contractions(b).len();
        &self.entry(a, b)[ga * n_gb + gb]
    }

    pub fn n_pairs(&self) -> usize {
        self.pairs.len()
    }

    pub fn n_negligible(&self) -> usize {
        self.pairs.iter().filter(|p| p.negligible).count()
    }
}

fn same_basis(a: &Arc<BasisSet>, b: &Arc<BasisSet>) -> bool {
    Arc::ptr_eq(a, b) || **a == **b
}

/// Converted shells of the four positions and the bra (1,2) and ket (3,4)
/// pair tables, with equal basis sets sharing storage.
#[derive(Debug, Clone)]
pub struct TableSet {
    pub shells: [Arc<ShellVec>; 4],
    pub bra: Arc<ShellPairTable>,
    pub ket: Arc<ShellPairTable>,
}

impl TableSet {
    pub fn build(bases: &[Arc<BasisSet>; 4], threshold: f64, cache: Option<&PairTableCache>) -> Result<Self> {
        let mut shells: Vec<Arc<ShellVec>> = Vec::with_capacity(4);
        for (i, basis) in bases.iter().enumerate() {
            if let Some(j) = (0..i).find(|&j| same_basis(&bases[j], basis)) {
                tracing::debug!("Basis set {} shares converted shells with basis set {}", i, j);
                shells.push(shells[j].clone());
                continue;
            }
            let sv = match cache {
                Some(cache) => cache.shells(basis, i)?,
                None => Arc::new(ShellVec::build(basis.clone(), i)?),
            };
            shells.push(sv);
        }
        let shells: [Arc<ShellVec>; 4] = [
            shells[0].clone(),
            shells[1].clone(),
            shells[2].clone(),
            shells[3].clone(),
        ];

        let make = |a: &Arc<ShellVec>, b: &Arc<ShellVec>| match cache {
            Some(cache) => cache.pair_table(a, b, threshold),
            None => Arc::new(ShellPairTable::build(a.clone(), b.clone(), threshold)),
        };

        let bra = make(&shells[0], &shells[1]);
        let ket = if Arc::ptr_eq(&shells[0], &shells[2]) && Arc::ptr_eq(&shells[1], &shells[3]) {
            tracing::debug!("Ket shell-pair table shared with the bra table");
            bra.clone()
        } else {
            make(&shells[2], &shells[3])
        };

        Ok(Self { shells, bra, ket })
    }

    /// Number of distinct converted shell vectors.
    pub fn n_unique_shells(&self) -> usize {
        (0..4)
            .filter(|&i| (0..i).all(|j| !Arc::ptr_eq(&self.shells[i], &self.shells[j])))
            .count()
    }
}

type PairKey = (u64, u64, u64);
type Registry<K, T> = Mutex<FxHashMap<K, Vec<Weak<T>>>>;

/// Live entry under `key` accepted by `matches`. The lock is released on
/// return, so callers build misses without holding it.
fn lookup<K: Hash + Eq, T>(registry: &Registry<K, T>, key: &K, matches: impl Fn(&T) -> bool) -> Option<Arc<T>> {
    let map = registry.lock().unwrap_or_else(PoisonError::into_inner);
    let found = map.get(key)?.iter().filter_map(Weak::upgrade).find(|t| matches(&**t));
    found
}

/// Registers `value` unless another thread stored a matching entry in the
/// meantime, in which case that entry is returned instead. Dead entries and
/// empty buckets are dropped on the way.
fn insert<K: Hash + Eq, T>(registry: &Registry<K, T>, key: K, value: Arc<T>, matches: impl Fn(&T) -> bool) -> Arc<T> {
    let mut map = registry.lock().unwrap_or_else(PoisonError::into_inner);
    map.retain(|_, bucket| {
        bucket.retain(|w| w.strong_count() > 0);
        !bucket.is_empty()
    });
    let bucket = map.entry(key).or_default();
    if let Some(existing) = bucket.iter().filter_map(Weak::upgrade).find(|t| matches(&**t)) {
        return existing;
    }
    bucket.push(Arc::downgrade(&value));
    value
}

/// Registry of converted shells and pair tables that several evaluators
/// can draw from. Only weak references are kept, so storage is released
/// when the last evaluator using it is dropped.
///
/// Builds run outside the registry locks; two threads missing on the same
/// key may both build, and the first to register wins.
#[derive(Debug, Default)]
pub struct PairTableCache {
    shells: Registry<u64, ShellVec>,
    tables: Registry<PairKey, ShellPairTable>,
}

impl PairTableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Converted shells for `basis`, reused when an equal set is alive.
    pub fn shells(&self, basis: &Arc<BasisSet>, position: usize) -> Result<Arc<ShellVec>> {
        let key = basis.identity_hash();
        let matches = |sv: &ShellVec| same_basis(sv.basis(), basis);
        if let Some(sv) = lookup(&self.shells, &key, matches) {
            tracing::debug!("Reusing cached shells for basis set {:016x}", key);
            return Ok(sv);
        }

        let sv = Arc::new(ShellVec::build(basis.clone(), position)?);
        Ok(insert(&self.shells, key, sv, matches))
    }

    /// Pair table over `a` x `b` at `threshold`, reused when alive.
    pub fn pair_table(&self, a: &Arc<ShellVec>, b: &Arc<ShellVec>, threshold: f64) -> Arc<ShellPairTable> {
        let key = (a.basis().identity_hash(), b.basis().identity_hash(), threshold.to_bits());
        let matches = |t: &ShellPairTable| {
            let [ta, tb] = t.shells();
            same_basis(ta.basis(), a.basis()) && same_basis(tb.basis(), b.basis())
        };
        if let Some(table) = lookup(&self.tables, &key, matches) {
            tracing::debug!("Reusing cached shell-pair table");
            return table;
        }

        let table = Arc::new(ShellPairTable::build(a.clone(), b.clone(), threshold));
        insert(&self.tables, key, table, matches)
    }

    /// Number of live pair tables in the registry.
    pub fn n_live_tables(&self) -> usize {
        let map = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        map.values().flatten().filter(|w| w.strong_count() > 0).count()
    }

    /// Number of keys held by the shell and pair-table registries.
    pub fn n_keys(&self) -> usize {
        let shells = self.shells.lock().unwrap_or_else(PoisonError::into_inner).len();
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner).len();
        shells + tables
    }
}
