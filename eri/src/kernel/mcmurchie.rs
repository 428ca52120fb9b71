//! McMurchie-Davidson evaluation of contracted Cartesian ERIs.
//!
//! (ab|cd) = 2 pi^{5/2} / (p q sqrt(p+q)) K_ab K_cd
//!           sum_{tuv} E^{ab}_{tuv} sum_{τνφ} (-1)^{τ+ν+φ} E^{cd}_{τνφ} R_{t+τ,u+ν,v+φ}
//! with the Hermite Coulomb integrals R built from the Boys function.

use super::boys::table as boys_table;
use super::PrimitiveKernel;
use crate::pair::ShellPair;
use basis::helper::{cartesian_components, n_cartesian};
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, Default)]
pub struct McMurchieDavidson;

#[inline]
fn cube(n: usize) -> usize {
    n * n * n
}

/// Fills one level n of R^n_{tuv} (t+u+v <= top) from level n+1.
fn hermite_level(target: &mut [f64], source: &[f64], dim: usize, top: usize, base: f64, pq: [f64; 3]) {
    let idx = |t: usize, u: usize, v: usize| (t * dim + u) * dim + v;
    for t in 0..=top {
        for u in 0..=top - t {
            for v in 0..=top - t - u {
                let r = if t > 0 {
                    let lower = if t > 1 { (t - 1) as f64 * source[idx(t - 2, u, v)] } else { 0.0 };
                    lower + pq[0] * source[idx(t - 1, u, v)]
                } else if u > 0 {
                    let lower = if u > 1 { (u - 1) as f64 * source[idx(t, u - 2, v)] } else { 0.0 };
                    lower + pq[1] * source[idx(t, u - 1, v)]
                } else if v > 0 {
                    let lower = if v > 1 { (v - 1) as f64 * source[idx(t, u, v - 2)] } else { 0.0 };
                    lower + pq[2] * source[idx(t, u, v - 1)]
                } else {
                    base
                };
                target[idx(t, u, v)] = r;
            }
        }
    }
}

impl McMurchieDavidson {
    pub fn new() -> Self {
        Self
    }

    fn scratch_len(l_total: usize, l_bra: usize) -> usize {
        2 * cube(l_total + 1) + (l_total + 1) + cube(l_bra + 1)
    }
}

impl PrimitiveKernel for McMurchieDavidson {
    fn work_len(&self, max_am: [usize; 4], _max_nprim: [usize; 4]) -> usize {
        let l_total = max_am.iter().sum::<usize>();
        let l_bra = (max_am[0] + max_am[1]).max(max_am[2] + max_am[3]);
        Self::scratch_len(l_total, l_bra)
    }

    fn compute(&self, bra: &ShellPair, ket: &ShellPair, tolerance: f64, work: &mut [f64], out: &mut [f64]) -> usize {
        if bra.bound * ket.bound < tolerance {
            return 0;
        }

        let [la, lb] = bra.am;
        let [lc, ld] = ket.am;
        let (na, nb, nc, nd) = (n_cartesian(la), n_cartesian(lb), n_cartesian(lc), n_cartesian(ld));
        let out = &mut out[..na * nb * nc * nd];
        out.fill(0.0);

        let l_ab = la + lb;
        let l_total = l_ab + lc + ld;
        let dim = l_total + 1;
        let dim_ab = l_ab + 1;
        debug_assert!(work.len() >= Self::scratch_len(l_total, l_ab));

        let (r_even, rest) = work.split_at_mut(cube(dim));
        let (r_odd, rest) = rest.split_at_mut(cube(dim));
        let (fvals, w) = rest.split_at_mut(dim);
        let w = &mut w[..cube(dim_ab)];
        let boys = boys_table();

        for (kb, pb) in bra.primitives.iter().enumerate() {
            let [ex_ab, ey_ab, ez_ab] = bra.hermite(kb);
            for (kk, pk) in ket.primitives.iter().enumerate() {
                if pb.bound * pk.bound < tolerance {
                    continue;
                }
                let [ex_cd, ey_cd, ez_cd] = ket.hermite(kk);

                let (p, q) = (pb.p, pk.p);
                let alpha = p * q / (p + q);
                let pq = pb.center - pk.center;
                boys.evaluate(l_total, alpha * pq.norm_squared(), fvals);

                // R^n for n = l_total down to 0, alternating between the two layers
                let mut scale = (-2.0 * alpha).powi(l_total as i32);
                for n in (0..=l_total).rev() {
                    let top = l_total - n;
                    let base = scale * fvals[n];
                    if top % 2 == 0 {
                        hermite_level(r_even, r_odd, dim, top, base, [pq.x, pq.y, pq.z]);
                    } else {
                        hermite_level(r_odd, r_even, dim, top, base, [pq.x, pq.y, pq.z]);
                    }
                    scale /= -2.0 * alpha;
                }
                let r: &[f64] = if l_total % 2 == 0 { &*r_even } else { &*r_odd };
                let ridx = |t: usize, u: usize, v: usize| (t * dim + u) * dim + v;

                let prefactor =
                    2.0 * PI.powf(2.5) / (p * q * (p + q).sqrt()) * pb.prefactor * pk.prefactor;

                for (ic, (cx, cy, cz)) in cartesian_components(lc).enumerate() {
                    for (id, (dx, dy, dz)) in cartesian_components(ld).enumerate() {
                        // contract the ket side into W_{tuv}
                        w.fill(0.0);
                        for t in 0..=l_ab {
                            for u in 0..=l_ab - t {
                                for v in 0..=l_ab - t - u {
                                    let mut acc = 0.0;
                                    for tau in 0..=cx + dx {
                                        let e1 = ex_cd[ket.e_index(cx, dx, tau)];
                                        if e1 == 0.0 {
                                            continue;
                                        }
                                        for nu in 0..=cy + dy {
                                            let e2 = e1 * ey_cd[ket.e_index(cy, dy, nu)];
                                            for phi in 0..=cz + dz {
                                                let e3 = e2 * ez_cd[ket.e_index(cz, dz, phi)];
                                                let sign = if (tau + nu + phi) % 2 == 0 { 1.0 } else { -1.0 };
                                                acc += sign * e3 * r[ridx(t + tau, u + nu, v + phi)];
                                            }
                                        }
                                    }
                                    w[(t * dim_ab + u) * dim_ab + v] = acc;
                                }
                            }
                        }

                        for (ia, (ax, ay, az)) in cartesian_components(la).enumerate() {
                            for (ib, (bx, by, bz)) in cartesian_components(lb).enumerate() {
                                let mut val = 0.0;
                                for t in 0..=ax + bx {
                                    let e1 = ex_ab[bra.e_index(ax, bx, t)];
                                    if e1 == 0.0 {
                                        continue;
                                    }
                                    for u in 0..=ay + by {
                                        let e2 = e1 * ey_ab[bra.e_index(ay, by, u)];
                                        for v in 0..=az + bz {
                                            val += e2 * ez_ab[bra.e_index(az, bz, v)] * w[(t * dim_ab + u) * dim_ab + v];
                                        }
                                    }
                                }
                                out[((ia * nb + ib) * nc + ic) * nd + id] += prefactor * val;
                            }
                        }
                    }
                }
            }
        }

        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::Shell;
    use nalgebra::Vector3;

    fn s_shell(a: f64, center: Vector3<f64>) -> Shell {
        let mut sh = Shell::new(0, center, vec![a], vec![1.0]);
        sh.normalize();
        sh
    }

    fn run(a: &Shell, b: &Shell, c: &Shell, d: &Shell, tolerance: f64) -> (usize, Vec<f64>) {
        let kernel = McMurchieDavidson::new();
        let bra = ShellPair::new(a, b, 0.0);
        let ket = ShellPair::new(c, d, 0.0);
        let mut work = vec![0.0; kernel.work_len([a.am, b.am, c.am, d.am], [1; 4])];
        let n = a.n_cartesian() * b.n_cartesian() * c.n_cartesian() * d.n_cartesian();
        let mut out = vec![f64::NAN; n];
        let written = kernel.compute(&bra, &ket, tolerance, &mut work, &mut out);
        (written, out)
    }

    #[test]
    fn test_ssss_same_center() {
        let a = 1.7;
        let s = s_shell(a, Vector3::zeros());
        let (written, out) = run(&s, &s, &s, &s, 0.0);
        assert_eq!(written, 1);
        assert!((out[0] - 2.0 * (a / PI).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_ssss_two_centers() {
        // (aa|bb) for normalized s functions on distinct centers is
        // erf(sqrt(a b/(a+b)) R) / R when each charge distribution is a
        // product of one function with itself.
        let sa = s_shell(0.5, Vector3::zeros());
        let sb = s_shell(0.8, Vector3::new(0.0, 0.0, 1.5));
        let (_, out) = run(&sa, &sa, &sb, &sb, 0.0);
        let (p, q) = (1.0, 1.6);
        let alpha: f64 = p * q / (p + q);
        let expected = libm::erf(alpha.sqrt() * 1.5) / 1.5;
        assert!((out[0] - expected).abs() < 1e-12, "{} vs {}", out[0], expected);
    }

    #[test]
    fn test_screened_quartet_returns_zero() {
        let s = s_shell(1.0, Vector3::zeros());
        let far = s_shell(1.0, Vector3::new(30.0, 0.0, 0.0));
        let (written, out) = run(&s, &far, &s, &far, 1e-10);
        assert_eq!(written, 0);
        assert!(out[0].is_nan());
    }

    #[test]
    fn test_s_pair_bounds_hold() {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let mut random_s = || {
            let center = Vector3::new(
                rng.gen_range(-2.0..2.0),
                rng.gen_range(-2.0..2.0),
                rng.gen_range(-2.0..2.0),
            );
            s_shell(rng.gen_range(0.1..5.0), center)
        };
        for _ in 0..50 {
            let (a, b, c, d) = (random_s(), random_s(), random_s(), random_s());
            let bound = ShellPair::new(&a, &b, 0.0).bound * ShellPair::new(&c, &d, 0.0).bound;
            let (_, out) = run(&a, &b, &c, &d, 0.0);
            assert!(out[0].abs() <= bound * (1.0 + 1e-12), "{} > {}", out[0], bound);
        }
    }

    #[test]
    fn test_high_am_quartet_is_finite() {
        let mut g = Shell::new(4, Vector3::new(0.2, 0.1, 0.0), vec![0.9], vec![1.0]);
        g.normalize();
        let s = s_shell(0.6, Vector3::new(0.0, 0.4, -0.3));
        let (written, out) = run(&g, &s, &g, &s, 0.0);
        assert_eq!(written, 1);
        assert_eq!(out.len(), 15 * 15);
        assert!(out.iter().all(|v| v.is_finite()));
        // (g_xxxx s|g_xxxx s) is a self-repulsion and must be positive
        assert!(out[0] > 0.0);
    }
}
