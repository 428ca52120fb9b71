#[cfg(test)]
mod tests {
    use crate::config::{EriOptions, SphericalOrdering};
    use crate::driver::fill_tensor;
    use crate::error::EriError;
    use crate::evaluator::{cache_key, EriBuilder};
    use crate::kernel::PrimitiveKernel;
    use crate::pair::ShellPair;
    use crate::table::{PairTableCache, ShellPairTable, ShellVec};
    use basis::helper::n_cartesian;
    use basis::{BasisSet, BasisShell, Contraction, ShellType};
    use nalgebra::Vector3;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Kernel that writes a recognizable pattern and counts its calls.
    struct MockKernel {
        calls: AtomicUsize,
        sizing: AtomicUsize,
        returns: usize,
        fill: f64,
    }

    impl MockKernel {
        fn new(returns: usize, fill: f64) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                sizing: AtomicUsize::new(0),
                returns,
                fill,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl PrimitiveKernel for MockKernel {
        fn work_len(&self, _max_am: [usize; 4], _max_nprim: [usize; 4]) -> usize {
            self.sizing.fetch_add(1, Ordering::SeqCst);
            4
        }

        fn compute(&self, bra: &ShellPair, ket: &ShellPair, _tolerance: f64, _work: &mut [f64], out: &mut [f64]) -> usize {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let n = n_cartesian(bra.am[0]) * n_cartesian(bra.am[1]) * n_cartesian(ket.am[0]) * n_cartesian(ket.am[1]);
            out[..n].fill(self.fill);
            self.returns
        }
    }

    fn shell(am: usize, center: Vector3<f64>, shell_type: ShellType) -> BasisShell {
        BasisShell::segmented(am, center, vec![2.0, 0.4], vec![0.6, 0.5], shell_type).unwrap()
    }

    fn sp_shell(center: Vector3<f64>) -> BasisShell {
        BasisShell::new(
            center,
            vec![3.0, 0.7],
            vec![
                Contraction { am: 0, coefficients: vec![-0.2, 1.1] },
                Contraction { am: 1, coefficients: vec![0.4, 0.7] },
            ],
            ShellType::Spherical,
        )
        .unwrap()
    }

    fn mixed_basis() -> Arc<BasisSet> {
        Arc::new(BasisSet::new(
            "mixed",
            vec![
                shell(0, Vector3::new(0.0, 0.0, 0.0), ShellType::Spherical),
                sp_shell(Vector3::new(0.0, 0.0, 1.2)),
                shell(2, Vector3::new(0.3, -0.5, 0.0), ShellType::Spherical),
                shell(2, Vector3::new(-0.4, 0.1, 0.9), ShellType::Cartesian),
            ],
        ))
    }

    fn single(am: usize, center: Vector3<f64>) -> Arc<BasisSet> {
        Arc::new(BasisSet::new("single", vec![shell(am, center, ShellType::Spherical)]))
    }

    #[test]
    fn test_output_length_matches_function_counts() {
        let kernel = MockKernel::new(1, 1.0);
        let b = mixed_basis();
        let mut ev = EriBuilder::with_kernel(kernel.clone())
            .initialize(0, [b.clone(), b.clone(), b.clone(), b.clone()])
            .unwrap();
        let n = b.len();
        for s1 in 0..n {
            for s2 in 0..n {
                for s3 in 0..n {
                    for s4 in 0..n {
                        let counts = ev.function_counts(s1, s2, s3, s4).unwrap();
                        let expected: usize = [s1, s2, s3, s4]
                            .iter()
                            .map(|&s| b.shell(s).n_functions())
                            .product();
                        assert_eq!(counts.iter().product::<usize>(), expected);
                        assert_eq!(ev.evaluate(s1, s2, s3, s4).unwrap().len(), expected);
                    }
                }
            }
        }
        assert!(kernel.calls() >= n.pow(4));
    }

    #[test]
    fn test_equal_sets_share_pair_tables() {
        let a = mixed_basis();
        let b = single(1, Vector3::new(1.0, 1.0, 0.0));
        let threshold = 1e-14;
        let options = EriOptions {
            pair_threshold: threshold,
            ..EriOptions::default()
        };
        let ev = EriBuilder::new()
            .options(options)
            .initialize(0, [a.clone(), b.clone(), a.clone(), b.clone()])
            .unwrap();
        assert!(Arc::ptr_eq(ev.bra_table(), ev.ket_table()));
        assert_eq!(ev.tables().n_unique_shells(), 2);

        let standalone = ShellPairTable::build(
            Arc::new(ShellVec::build(a.clone(), 0).unwrap()),
            Arc::new(ShellVec::build(b.clone(), 1).unwrap()),
            threshold,
        );
        assert_eq!(standalone.dims(), ev.bra_table().dims());
        for i in 0..a.len() {
            for j in 0..b.len() {
                assert_eq!(standalone.entry(i, j), ev.ket_table().entry(i, j));
            }
        }
    }

    #[test]
    fn test_shared_tables_give_same_values() {
        let a = mixed_basis();
        let copy = Arc::new((*a).clone());
        let cache = Arc::new(PairTableCache::new());
        let mut plain = EriBuilder::new()
            .initialize(0, [a.clone(), a.clone(), a.clone(), a.clone()])
            .unwrap();
        let mut cached = EriBuilder::new()
            .cache(cache.clone())
            .initialize(0, [a.clone(), copy.clone(), copy.clone(), a.clone()])
            .unwrap();
        assert_eq!(cached.tables().n_unique_shells(), 1);
        for (s1, s2, s3, s4) in [(0, 1, 2, 3), (1, 1, 1, 1), (3, 2, 0, 1)] {
            let x = plain.evaluate(s1, s2, s3, s4).unwrap().to_vec();
            let y = cached.evaluate(s1, s2, s3, s4).unwrap().to_vec();
            assert_eq!(x, y);
        }
        assert_eq!(cache.n_live_tables(), 1);
    }

    #[test]
    fn test_repeated_evaluation_is_bit_identical() {
        let b = mixed_basis();
        let mut ev = EriBuilder::new()
            .initialize(0, [b.clone(), b.clone(), b.clone(), b.clone()])
            .unwrap();
        let first: Vec<u64> = ev.evaluate(2, 1, 3, 2).unwrap().iter().map(|v| v.to_bits()).collect();
        let second: Vec<u64> = ev.evaluate(2, 1, 3, 2).unwrap().iter().map(|v| v.to_bits()).collect();
        assert_eq!(first, second);
        assert!(first.iter().any(|&bits| f64::from_bits(bits) != 0.0));
    }

    #[test]
    fn test_derivative_order_rejected() {
        let kernel = MockKernel::new(1, 1.0);
        for basis in [mixed_basis(), single(0, Vector3::zeros()), single(8, Vector3::zeros())] {
            for order in [1, 2] {
                let result = EriBuilder::with_kernel(kernel.clone())
                    .initialize(order, [basis.clone(), basis.clone(), basis.clone(), basis.clone()]);
                assert!(matches!(
                    result,
                    Err(EriError::NotImplemented { derivative_order }) if derivative_order == order
                ));
            }
        }
        assert_eq!(kernel.calls(), 0);
    }

    #[test]
    fn test_l8_rejected_before_kernel_use() {
        let kernel = MockKernel::new(1, 1.0);
        let ok = mixed_basis();
        let bad = Arc::new(BasisSet::new(
            "bad",
            vec![
                shell(1, Vector3::zeros(), ShellType::Spherical),
                shell(8, Vector3::zeros(), ShellType::Spherical),
            ],
        ));
        let result = EriBuilder::with_kernel(kernel.clone()).initialize(0, [ok.clone(), ok.clone(), ok, bad]);
        assert!(matches!(
            result,
            Err(EriError::UnsupportedAngularMomentum {
                am: 8,
                max: 7,
                basis: 3,
                shell: 1
            })
        ));
        assert_eq!(kernel.calls(), 0);
        assert_eq!(kernel.sizing.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_single_s_quartet_passes_through() {
        let kernel = MockKernel::new(1, 42.0);
        let s = Arc::new(BasisSet::new(
            "s",
            vec![BasisShell::segmented(0, Vector3::zeros(), vec![1.0], vec![1.0], ShellType::Spherical).unwrap()],
        ));
        let mut ev = EriBuilder::with_kernel(kernel.clone())
            .initialize(0, [s.clone(), s.clone(), s.clone(), s.clone()])
            .unwrap();
        assert_eq!(ev.sizes().cartesian, 1);
        assert_eq!(ev.sizes().spherical, 1);
        assert_eq!(ev.sizes().combinations, 1);
        assert_eq!(ev.evaluate(0, 0, 0, 0).unwrap(), &[42.0]);
        assert_eq!(kernel.calls(), 1);
    }

    #[test]
    fn test_pure_d_buffer_sizes() {
        let d = Arc::new(BasisSet::new(
            "d",
            vec![
                shell(2, Vector3::zeros(), ShellType::Spherical),
                shell(1, Vector3::new(0.0, 0.0, 1.0), ShellType::Spherical),
                shell(2, Vector3::new(0.0, 1.0, 1.0), ShellType::Spherical),
            ],
        ));
        let ev = EriBuilder::new()
            .initialize(0, [d.clone(), d.clone(), d.clone(), d.clone()])
            .unwrap();
        assert_eq!(ev.sizes().cartesian, 1296);
        assert_eq!(ev.sizes().spherical, 625);
        assert_eq!(ev.sizes().transform, 2 * 1296);
    }

    #[test]
    fn test_bad_index_leaves_evaluator_usable() {
        let b = mixed_basis();
        let mut ev = EriBuilder::new()
            .initialize(0, [b.clone(), b.clone(), b.clone(), b.clone()])
            .unwrap();
        assert_eq!(
            ev.evaluate(0, 0, 9, 0).unwrap_err(),
            EriError::ShellIndexOutOfRange {
                position: 2,
                index: 9,
                len: 4
            }
        );
        assert_eq!(ev.evaluate(0, 0, 0, 0).unwrap().len(), 1);
    }

    #[test]
    fn test_evaluate_into() {
        let b = mixed_basis();
        let mut ev = EriBuilder::new()
            .initialize(0, [b.clone(), b.clone(), b.clone(), b.clone()])
            .unwrap();
        let mut short = vec![0.0; 10];
        assert_eq!(
            ev.evaluate_into(1, 1, 2, 0, &mut short),
            Err(EriError::BufferTooSmall {
                required: 4 * 4 * 5,
                supplied: 10
            })
        );

        let mut out = vec![f64::NAN; 100];
        let n = ev.evaluate_into(1, 1, 2, 0, &mut out).unwrap();
        assert_eq!(n, 80);
        assert_eq!(&out[..n], ev.evaluate(1, 1, 2, 0).unwrap());
        assert!(out[n..].iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_screened_block_is_zero_filled() {
        let kernel = MockKernel::new(0, 99.0);
        let b = mixed_basis();
        let mut ev = EriBuilder::with_kernel(kernel.clone())
            .initialize(0, [b.clone(), b.clone(), b.clone(), b.clone()])
            .unwrap();
        assert!(ev.evaluate(1, 2, 3, 1).unwrap().iter().all(|&v| v == 0.0));
        assert_eq!(ev.evaluate(0, 0, 0, 0).unwrap(), &[0.0]);
    }

    #[test]
    fn test_kernel_overrun_is_reported() {
        let kernel = MockKernel::new(2, 1.0);
        let d = single(2, Vector3::zeros());
        let mut ev = EriBuilder::with_kernel(kernel)
            .initialize(0, [d.clone(), d.clone(), d.clone(), d.clone()])
            .unwrap();
        assert!(matches!(
            ev.evaluate(0, 0, 0, 0),
            Err(EriError::InvariantViolation {
                required: 2592,
                available: 1296,
                ..
            })
        ));
    }

    #[test]
    fn test_cache_key() {
        let a = mixed_basis();
        let b = single(1, Vector3::zeros());
        let key = cache_key(0, [&*a, &*b, &*a, &*b]);
        assert_eq!(key.len(), 65);
        assert!(key.ends_with('0'));
        assert_eq!(&key[..16], a.hash_string());
        assert_eq!(&key[16..32], b.hash_string());
        assert_eq!(key, cache_key(0, [&*a, &*b, &*a, &*b]));

        let renamed = BasisSet {
            name: "other".to_string(),
            ..(*a).clone()
        };
        assert_eq!(key, cache_key(0, [&renamed, &*b, &*a, &*b]));
        assert_ne!(key, cache_key(1, [&*a, &*b, &*a, &*b]));
        assert_ne!(key, cache_key(0, [&*b, &*a, &*a, &*b]));

        let ev = EriBuilder::new()
            .initialize(0, [a.clone(), b.clone(), a.clone(), b.clone()])
            .unwrap();
        assert_eq!(ev.cache_key(), key);
    }

    #[test]
    fn test_fork_shares_tables() {
        let b = mixed_basis();
        let mut ev = EriBuilder::new()
            .initialize(0, [b.clone(), b.clone(), b.clone(), b.clone()])
            .unwrap();
        let mut forked = ev.fork();
        assert!(Arc::ptr_eq(ev.bra_table(), forked.bra_table()));
        assert_eq!(ev.sizes(), forked.sizes());
        let x = ev.evaluate(3, 1, 2, 0).unwrap().to_vec();
        let y = forked.evaluate(3, 1, 2, 0).unwrap().to_vec();
        assert_eq!(x, y);
    }

    #[test]
    fn test_gaussian_ordering_of_p_functions() {
        let p = single(1, Vector3::new(0.2, -0.3, 0.5));
        let s = single(0, Vector3::new(-0.4, 0.1, 0.0));
        let bases = [p.clone(), s.clone(), s.clone(), s.clone()];
        let mut standard = EriBuilder::new().initialize(0, bases.clone()).unwrap();
        let mut gaussian = EriBuilder::new()
            .options(EriOptions {
                ordering: SphericalOrdering::Gaussian,
                ..EriOptions::default()
            })
            .initialize(0, bases)
            .unwrap();
        // standard (m=-1, 0, +1) = (y, z, x); gaussian (0, +1, -1) = (z, x, y)
        let a = standard.evaluate(0, 0, 0, 0).unwrap().to_vec();
        let b = gaussian.evaluate(0, 0, 0, 0).unwrap().to_vec();
        assert_eq!(b, vec![a[1], a[2], a[0]]);
    }

    #[test]
    fn test_general_contraction_matches_split_shells() {
        let center = Vector3::new(0.1, 0.0, -0.2);
        let sp = sp_shell(center);
        let split_s = BasisShell::segmented(0, center, sp.exponents.clone(), sp.coefficients(0).to_vec(), ShellType::Spherical)
            .unwrap();
        let split_p = BasisShell::segmented(1, center, sp.exponents.clone(), sp.coefficients(1).to_vec(), ShellType::Spherical)
            .unwrap();
        let other = shell(2, Vector3::new(0.0, 0.8, 0.4), ShellType::Spherical);

        let general = Arc::new(BasisSet::new("general", vec![sp, other.clone()]));
        let split = Arc::new(BasisSet::new("split", vec![split_s, split_p, other]));
        assert_eq!(general.n_functions(), split.n_functions());

        let ev_general = EriBuilder::new()
            .initialize(0, [general.clone(), general.clone(), general.clone(), general])
            .unwrap();
        let ev_split = EriBuilder::new()
            .initialize(0, [split.clone(), split.clone(), split.clone(), split])
            .unwrap();
        let a = fill_tensor(&ev_general, None).unwrap();
        let b = fill_tensor(&ev_split, None).unwrap();
        assert_eq!(a.dims, b.dims);
        for (x, y) in a.values.iter().zip(&b.values) {
            assert!((x - y).abs() < 1e-12);
        }
    }
}
