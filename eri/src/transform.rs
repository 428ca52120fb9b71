//! Cartesian to real solid harmonic transformation of integral blocks.
//!
//! Cartesian components of angular momentum l are ordered lx descending,
//! then ly descending, and all carry the normalization of x^l. Solid
//! harmonics are produced in the order chosen by [`SphericalOrdering`].

use crate::config::{EriOptions, SphericalOrdering};
use crate::error::{EriError, Result};
use crate::shell::MAX_AM;
use basis::helper::{cartesian_components, double_factorial, factorial, n_cartesian, n_spherical};
use basis::{BasisShell, ShellType};
use itertools::iproduct;
use std::f64::consts::SQRT_2;
use std::sync::OnceLock;

fn parity(k: i32) -> i32 {
    if k % 2 != 0 {
        -1
    } else {
        1
    }
}

fn binomial(n: i32, k: i32) -> f64 {
    if k < 0 || k > n {
        return 0.0;
    }
    factorial(n) / (factorial(k) * factorial(n - k))
}

/// Coefficient of the Cartesian Gaussian x^lx y^ly z^lz in the real solid
/// harmonic (l, m), both normalized.
pub fn solid_harmonic_coefficient(l: usize, m: i32, lx: usize, ly: usize, lz: usize) -> f64 {
    let (l, lx, ly, lz) = (l as i32, lx as i32, ly as i32, lz as i32);
    let abs_m = m.abs();
    if (l - lz - abs_m) % 2 != 0 {
        return 0.0;
    }
    let j = (l - lz - abs_m) / 2;
    if j < 0 {
        return 0.0;
    }
    let comp = if m >= 0 { 1 } else { -1 };
    let i = abs_m - lx;
    if comp != parity(i.abs()) {
        return 0.0;
    }

    let mut pfac = (factorial(2 * lx) * factorial(2 * ly) * factorial(2 * lz) * factorial(l) * factorial(l - abs_m)
        / (factorial(2 * l) * factorial(lx) * factorial(ly) * factorial(lz) * factorial(l + abs_m)))
        .sqrt();
    pfac /= 2f64.powi(l) * factorial(l);
    pfac *= if m < 0 {
        parity((i - 1) / 2)
    } else {
        parity(i / 2)
    } as f64;

    let mut sum = 0.0;
    for ii in j..=(l - abs_m) / 2 {
        let pfac1 = binomial(l, ii) * binomial(ii, j) * parity(ii) as f64 * factorial(2 * (l - ii))
            / factorial(l - abs_m - 2 * ii);
        let mut sum1 = 0.0;
        for k in ((lx - abs_m) / 2).max(0)..=j.min(lx / 2) {
            if lx - 2 * k <= abs_m {
                sum1 += binomial(j, k) * binomial(abs_m, lx - 2 * k) * parity(k) as f64;
            }
        }
        sum += pfac1 * sum1;
    }
    sum *= (double_factorial(2 * l - 1)
        / (double_factorial(2 * lx - 1) * double_factorial(2 * ly - 1) * double_factorial(2 * lz - 1)))
        .sqrt();

    if m == 0 {
        pfac * sum
    } else {
        SQRT_2 * pfac * sum
    }
}

/// Row-major (n_out x n_cartesian) coefficient matrices for l = 0..=MAX_AM.
struct HarmonicTables {
    standard: Vec<Vec<f64>>,
    gaussian: Vec<Vec<f64>>,
    cartesian_norm: Vec<Vec<f64>>,
}

static TABLES: OnceLock<HarmonicTables> = OnceLock::new();

fn spherical_matrix(l: usize, ordering: SphericalOrdering) -> Vec<f64> {
    let ncart = n_cartesian(l);
    let mut c = vec![0.0; n_spherical(l) * ncart];
    for m in -(l as i32)..=(l as i32) {
        let row = ordering.position(l, m);
        for (col, (lx, ly, lz)) in cartesian_components(l).enumerate() {
            c[row * ncart + col] = solid_harmonic_coefficient(l, m, lx, ly, lz);
        }
    }
    c
}

fn cartesian_norm_matrix(l: usize) -> Vec<f64> {
    let ncart = n_cartesian(l);
    let axial = double_factorial(2 * l as i32 - 1);
    let mut c = vec![0.0; ncart * ncart];
    for (i, (lx, ly, lz)) in cartesian_components(l).enumerate() {
        let component = double_factorial(2 * lx as i32 - 1)
            * double_factorial(2 * ly as i32 - 1)
            * double_factorial(2 * lz as i32 - 1);
        c[i * ncart + i] = (axial / component).sqrt();
    }
    c
}

fn tables() -> &'static HarmonicTables {
    TABLES.get_or_init(|| HarmonicTables {
        standard: (0..=MAX_AM)
            .map(|l| spherical_matrix(l, SphericalOrdering::Standard))
            .collect(),
        gaussian: (0..=MAX_AM)
            .map(|l| spherical_matrix(l, SphericalOrdering::Gaussian))
            .collect(),
        cartesian_norm: (0..=MAX_AM).map(cartesian_norm_matrix).collect(),
    })
}

/// Builds the coefficient tables if this has not happened yet.
pub(crate) fn init_tables() {
    tables();
}

/// Where one generalized contraction lands among the functions of its shell.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractionLayout {
    pub am: usize,
    pub offset: usize,
    pub n_functions: usize,
}

/// Function layout of one basis shell, all contractions included.
#[derive(Debug, Clone, PartialEq)]
pub struct ShellLayout {
    pub shell_type: ShellType,
    pub contractions: Vec<ContractionLayout>,
    pub n_functions: usize,
    pub n_cartesian: usize,
}

impl ShellLayout {
    pub fn from_basis_shell(shell: &BasisShell) -> Self {
        let mut offset = 0;
        let contractions = (0..shell.n_general_contractions())
            .map(|g| {
                let n_functions = shell.general_n_functions(g);
                let layout = ContractionLayout {
                    am: shell.general_am(g),
                    offset,
                    n_functions,
                };
                offset += n_functions;
                layout
            })
            .collect();
        Self {
            shell_type: shell.shell_type,
            contractions,
            n_functions: offset,
            n_cartesian: shell.n_cartesian(),
        }
    }
}

/// out[a][o][b] = sum_i coef[o][i] * input[a][i][b]
fn transform_index(
    input: &[f64],
    output: &mut [f64],
    outer: usize,
    inner: usize,
    n_in: usize,
    n_out: usize,
    coef: &[f64],
) {
    for a in 0..outer {
        let src = &input[a * n_in * inner..(a + 1) * n_in * inner];
        let dst = &mut output[a * n_out * inner..(a + 1) * n_out * inner];
        dst.fill(0.0);
        for (o, row) in coef.chunks_exact(n_in).enumerate() {
            let d = &mut dst[o * inner..(o + 1) * inner];
            for (i, &c) in row.iter().enumerate() {
                if c == 0.0 {
                    continue;
                }
                for (x, y) in d.iter_mut().zip(&src[i * inner..(i + 1) * inner]) {
                    *x += c * y;
                }
            }
        }
    }
}

enum Location {
    Input,
    First,
    Second,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transformer {
    ordering: SphericalOrdering,
    normalize_cartesian: bool,
}

impl Transformer {
    pub fn new(options: &EriOptions) -> Self {
        Self {
            ordering: options.ordering,
            normalize_cartesian: options.normalize_cartesian,
        }
    }

    /// Coefficient matrix applied to one contraction, `None` when the
    /// Cartesian block is already final.
    pub fn matrix(&self, am: usize, shell_type: ShellType) -> Option<&'static [f64]> {
        let tables = tables();
        match shell_type {
            ShellType::Spherical if am == 0 => None,
            ShellType::Spherical => Some(match self.ordering {
                SphericalOrdering::Standard => &tables.standard[am],
                SphericalOrdering::Gaussian => &tables.gaussian[am],
            }),
            ShellType::Cartesian if am <= 1 || !self.normalize_cartesian => None,
            ShellType::Cartesian => Some(&tables.cartesian_norm[am]),
        }
    }

    /// True when the Cartesian buffer of a quartet over these shells is
    /// already the final tensor.
    pub fn is_passthrough(&self, layouts: [&ShellLayout; 4]) -> bool {
        layouts.iter().all(|layout| {
            layout.contractions.len() == 1 && self.matrix(layout.contractions[0].am, layout.shell_type).is_none()
        })
    }

    /// Transforms one contracted Cartesian block through the two scratch
    /// halves and returns the slice that holds the result.
    fn transform_block<'a>(
        &self,
        ams: [usize; 4],
        shell_type: [ShellType; 4],
        input: &'a [f64],
        first: &'a mut [f64],
        second: &'a mut [f64],
    ) -> &'a [f64] {
        let mut dims = ams.map(n_cartesian);
        let mut loc = Location::Input;

        for k in (0..4).rev() {
            let Some(coef) = self.matrix(ams[k], shell_type[k]) else {
                continue;
            };
            let n_in = dims[k];
            let n_out = coef.len() / n_in;
            let outer: usize = dims[..k].iter().product();
            let inner: usize = dims[k + 1..].iter().product();

            loc = match loc {
                Location::Input => {
                    transform_index(input, first, outer, inner, n_in, n_out, coef);
                    Location::First
                }
                Location::First => {
                    transform_index(first, second, outer, inner, n_in, n_out, coef);
                    Location::Second
                }
                Location::Second => {
                    transform_index(second, first, outer, inner, n_in, n_out, coef);
                    Location::First
                }
            };
            dims[k] = n_out;
        }

        let n: usize = dims.iter().product();
        match loc {
            Location::Input => &input[..n],
            Location::First => {
                let s: &'a [f64] = first;
                &s[..n]
            }
            Location::Second => {
                let s: &'a [f64] = second;
                &s[..n]
            }
        }
    }

    /// Rewrites the concatenated Cartesian blocks of a quartet into the
    /// dense output, row-major with the shell 4 function index fastest.
    /// `block_offsets` gives the start of each contraction combination in
    /// `cartesian`, in (g1, g2, g3, g4) row-major order. Returns the number
    /// of values written.
    pub fn transform(
        &self,
        layouts: [&ShellLayout; 4],
        cartesian: &[f64],
        block_offsets: &[usize],
        scratch: &mut [f64],
        out: &mut [f64],
    ) -> Result<usize> {
        let full = layouts.map(|l| l.n_functions);
        let total: usize = full.iter().product();
        if total > out.len() {
            return Err(EriError::InvariantViolation {
                what: "spherical output buffer",
                required: total,
                available: out.len(),
            });
        }

        let half = scratch.len() / 2;
        let (first, second) = scratch.split_at_mut(half);
        let shell_type = layouts.map(|l| l.shell_type);

        let combos = iproduct!(
            &layouts[0].contractions,
            &layouts[1].contractions,
            &layouts[2].contractions,
            &layouts[3].contractions
        );
        for ((c1, c2, c3, c4), &start) in combos.zip(block_offsets) {
            let ams = [c1.am, c2.am, c3.am, c4.am];
            let block_len: usize = ams.iter().map(|&l| n_cartesian(l)).product();
            if start + block_len > cartesian.len() {
                return Err(EriError::InvariantViolation {
                    what: "cartesian block",
                    required: start + block_len,
                    available: cartesian.len(),
                });
            }
            if block_len > half {
                return Err(EriError::InvariantViolation {
                    what: "transform scratch",
                    required: 2 * block_len,
                    available: scratch.len(),
                });
            }

            let block = self.transform_block(
                ams,
                shell_type,
                &cartesian[start..start + block_len],
                &mut first[..],
                &mut second[..],
            );

            let (n2, n3, n4) = (c2.n_functions, c3.n_functions, c4.n_functions);
            for (i, j, k) in iproduct!(0..c1.n_functions, 0..n2, 0..n3) {
                let src = ((i * n2 + j) * n3 + k) * n4;
                let dst = (((c1.offset + i) * full[1] + c2.offset + j) * full[2] + c3.offset + k) * full[3] + c4.offset;
                out[dst..dst + n4].copy_from_slice(&block[src..src + n4]);
            }
        }

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    /// Overlap of two uniformly normalized Cartesian components of the same l.
    fn cartesian_overlap(l: usize, a: (usize, usize, usize), b: (usize, usize, usize)) -> f64 {
        let sums = [a.0 + b.0, a.1 + b.1, a.2 + b.2];
        if sums.iter().any(|s| s % 2 != 0) {
            return 0.0;
        }
        sums.iter()
            .map(|&s| double_factorial(s as i32 - 1))
            .product::<f64>()
            / double_factorial(2 * l as i32 - 1)
    }

    #[test]
    fn test_known_coefficients() {
        assert!((solid_harmonic_coefficient(0, 0, 0, 0, 0) - 1.0).abs() < 1e-14);
        // p: m=-1 -> y, m=0 -> z, m=+1 -> x
        assert!((solid_harmonic_coefficient(1, -1, 0, 1, 0) - 1.0).abs() < 1e-14);
        assert!((solid_harmonic_coefficient(1, 0, 0, 0, 1) - 1.0).abs() < 1e-14);
        assert!((solid_harmonic_coefficient(1, 1, 1, 0, 0) - 1.0).abs() < 1e-14);
        // d0 = zz - (xx + yy) / 2
        assert!((solid_harmonic_coefficient(2, 0, 0, 0, 2) - 1.0).abs() < 1e-14);
        assert!((solid_harmonic_coefficient(2, 0, 2, 0, 0) + 0.5).abs() < 1e-14);
        assert!((solid_harmonic_coefficient(2, 2, 2, 0, 0) - 3f64.sqrt() / 2.0).abs() < 1e-14);
        assert!((solid_harmonic_coefficient(2, -2, 1, 1, 0) - 3f64.sqrt()).abs() < 1e-14);
        assert_eq!(solid_harmonic_coefficient(2, 1, 0, 0, 2), 0.0);
    }

    #[test]
    fn test_harmonics_are_orthonormal() {
        for l in 0..=MAX_AM {
            let comps: Vec<_> = cartesian_components(l).collect();
            let ncart = comps.len();
            let c = spherical_matrix(l, SphericalOrdering::Standard);
            for (r1, row1) in c.chunks_exact(ncart).enumerate() {
                for (r2, row2) in c.chunks_exact(ncart).enumerate() {
                    let mut s = 0.0;
                    for (i, a) in comps.iter().enumerate() {
                        for (j, b) in comps.iter().enumerate() {
                            s += row1[i] * row2[j] * cartesian_overlap(l, *a, *b);
                        }
                    }
                    let expected = if r1 == r2 { 1.0 } else { 0.0 };
                    assert!((s - expected).abs() < 1e-10, "l={} rows {} {} -> {}", l, r1, r2, s);
                }
            }
        }
    }

    #[test]
    fn test_gaussian_ordering_permutes_rows() {
        let standard = spherical_matrix(3, SphericalOrdering::Standard);
        let gaussian = spherical_matrix(3, SphericalOrdering::Gaussian);
        let ncart = n_cartesian(3);
        // m = +1 is row 4 in standard order and row 1 in gaussian order
        assert_eq!(&standard[4 * ncart..5 * ncart], &gaussian[ncart..2 * ncart]);
        // m = 0 leads the gaussian order
        assert_eq!(&standard[3 * ncart..4 * ncart], &gaussian[..ncart]);
    }

    #[test]
    fn test_cartesian_norm_factors() {
        let c = cartesian_norm_matrix(2);
        // xx keeps the axial factor, xy is scaled by sqrt(3)
        assert!((c[0] - 1.0).abs() < 1e-14);
        assert!((c[6 + 1] - 3f64.sqrt()).abs() < 1e-14);
    }

    fn layout(am: usize, shell_type: ShellType) -> ShellLayout {
        let shell = BasisShell::segmented(am, Vector3::zeros(), vec![1.0], vec![1.0], shell_type).unwrap();
        ShellLayout::from_basis_shell(&shell)
    }

    #[test]
    fn test_s_quartet_is_passthrough() {
        let t = Transformer::new(&EriOptions::default());
        let s = layout(0, ShellType::Spherical);
        let p = layout(1, ShellType::Spherical);
        let pc = layout(1, ShellType::Cartesian);
        assert!(t.is_passthrough([&s, &s, &s, &s]));
        assert!(t.is_passthrough([&s, &pc, &s, &pc]));
        assert!(!t.is_passthrough([&s, &s, &p, &s]));
    }

    #[test]
    fn test_p_permutation_and_sp_scatter() {
        let t = Transformer::new(&EriOptions::default());
        let s = layout(0, ShellType::Spherical);
        let sp = ShellLayout::from_basis_shell(
            &BasisShell::new(
                Vector3::zeros(),
                vec![1.0],
                vec![
                    basis::Contraction { am: 0, coefficients: vec![1.0] },
                    basis::Contraction { am: 1, coefficients: vec![1.0] },
                ],
                ShellType::Spherical,
            )
            .unwrap(),
        );
        assert_eq!(sp.n_functions, 4);

        // (s s | s sp): block 0 is (ss|ss) = 7, block 1 is (ss|s p) = x, y, z
        let cartesian = [7.0, 1.0, 2.0, 3.0];
        let mut scratch = vec![0.0; 6];
        let mut out = vec![0.0; 4];
        let n = t
            .transform([&s, &s, &s, &sp], &cartesian, &[0, 1], &mut scratch, &mut out)
            .unwrap();
        assert_eq!(n, 4);
        // standard order for p is (y, z, x)
        for (x, y) in out.iter().zip([7.0, 2.0, 3.0, 1.0]) {
            assert!((x - y).abs() < 1e-14);
        }
    }

    #[test]
    fn test_transform_reports_short_output() {
        let t = Transformer::new(&EriOptions::default());
        let d = layout(2, ShellType::Spherical);
        let cartesian = vec![0.0; 1296];
        let mut scratch = vec![0.0; 2 * 1296];
        let mut out = vec![0.0; 100];
        assert!(matches!(
            t.transform([&d, &d, &d, &d], &cartesian, &[0], &mut scratch, &mut out),
            Err(EriError::InvariantViolation { required: 625, available: 100, .. })
        ));
    }
}
