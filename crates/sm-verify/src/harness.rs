use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sm_matrix::{DType, Dispatcher, Element, Matrix, MatrixError, Strategy};

use crate::config::VerifyConfig;
use crate::error::Result;
use crate::report::{CaseReport, Outcome, StrategyRun, VerificationReport};

/// Runs every configured strategy on seeded random operands and compares
/// each result with the reference product.
#[derive(Debug)]
pub struct Verifier {
    config: VerifyConfig,
    dispatcher: Dispatcher,
}

impl Verifier {
    /// # Errors
    /// Returns `VerifyError::Config` if `config` fails validation.
    pub fn new(config: VerifyConfig, dispatcher: Dispatcher) -> Result<Self> {
        config.validate()?;
        Ok(Verifier { config, dispatcher })
    }

    pub fn config(&self) -> &VerifyConfig {
        &self.config
    }

    /// One case per configured size and element type, in that order.
    ///
    /// All operands come from a single generator seeded with
    /// `config.seed`, so two runs with the same configuration multiply the
    /// same matrices.
    pub fn run(&self) -> Result<VerificationReport> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut report = VerificationReport::new();

        for &size in &self.config.sizes {
            for &dtype in &self.config.dtypes {
                let case = match dtype {
                    DType::I8 => self.check::<i8, _>(&mut rng, size, i8::DEFAULT_EPSILON)?,
                    DType::I16 => self.check::<i16, _>(&mut rng, size, i16::DEFAULT_EPSILON)?,
                    DType::I32 => self.check::<i32, _>(&mut rng, size, i32::DEFAULT_EPSILON)?,
                    DType::F32 => {
                        let eps = self.config.epsilon.unwrap_or(f32::DEFAULT_EPSILON);
                        self.check::<f32, _>(&mut rng, size, eps)?
                    }
                };
                report.push(case);
            }
        }

        let failures = report.failures();
        log::info!(
            "verified {} cases on backend '{}': {} mismatches",
            report.cases().len(),
            self.dispatcher.backend().name(),
            failures.len()
        );
        Ok(report)
    }

    /// Verifies one `size x size` case of element type `T`, drawing both
    /// operands from `rng` over the type's default range.
    pub fn check<T: Element, R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        size: usize,
        epsilon: T,
    ) -> Result<CaseReport> {
        let mut a = Matrix::<T>::new(size, size)?;
        let mut b = Matrix::<T>::new(size, size)?;
        a.randomize_default_with(rng)?;
        b.randomize_default_with(rng)?;
        self.compare(&a, &b, epsilon)
    }

    /// Runs every configured strategy on `a @ b` and compares each with the
    /// reference product.
    pub fn compare<T: Element>(
        &self,
        a: &Matrix<T>,
        b: &Matrix<T>,
        epsilon: T,
    ) -> Result<CaseReport> {
        let width = self.config.vector_width;

        let start = Instant::now();
        let reference = self.dispatcher.multiply(a, b, Strategy::Reference, width)?;
        let reference_elapsed = start.elapsed();

        let mut runs = Vec::with_capacity(self.config.strategies.len());
        for &strategy in &self.config.strategies {
            if !strategy.is_external() {
                runs.push(StrategyRun {
                    strategy,
                    outcome: Outcome::Passed,
                    elapsed: reference_elapsed,
                });
                continue;
            }

            let start = Instant::now();
            let run = match self.dispatcher.multiply(a, b, strategy, width) {
                Ok(c) => {
                    let elapsed = start.elapsed();
                    let outcome = if reference.equals(&c, epsilon) {
                        Outcome::Passed
                    } else {
                        log::warn!(
                            "{} {} disagrees with reference for {}x{} @ {}x{}",
                            T::DTYPE,
                            strategy,
                            a.rows(),
                            a.cols(),
                            b.rows(),
                            b.cols()
                        );
                        Outcome::Mismatch
                    };
                    StrategyRun {
                        strategy,
                        outcome,
                        elapsed,
                    }
                }
                Err(MatrixError::UnsupportedType { .. }) => {
                    log::debug!(
                        "backend '{}' skips {} {}",
                        self.dispatcher.backend().name(),
                        T::DTYPE,
                        strategy
                    );
                    StrategyRun {
                        strategy,
                        outcome: Outcome::Unsupported,
                        elapsed: Duration::ZERO,
                    }
                }
                Err(e) => return Err(e.into()),
            };
            runs.push(run);
        }

        Ok(CaseReport {
            dtype: T::DTYPE,
            size: a.rows(),
            reference_elapsed,
            runs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sm_matrix::{GemmCall, KernelBackend, SaturationBounds, SoftwareKernels, VectorWidth};
    use std::sync::{Arc, Mutex};

    /// Computes the right shape but drops every saturation.
    #[derive(Debug)]
    struct WrappingKernels;

    impl KernelBackend for WrappingKernels {
        fn name(&self) -> &str {
            "wrapping"
        }

        fn naive_i8(&self, call: GemmCall<'_, i8>, _bounds: SaturationBounds<i8>) -> sm_matrix::Result<()> {
            let (m, k, n) = (call.m(), call.k(), call.n());
            let (a, b, out) = call.split();
            for i in 0..m {
                for j in 0..n {
                    let mut sum = 0i8;
                    for p in 0..k {
                        sum = sum.wrapping_add(a[i * k + p].wrapping_mul(b[p * n + j]));
                    }
                    out[i * n + j] = sum;
                }
            }
            Ok(())
        }
    }

    fn small_config() -> VerifyConfig {
        VerifyConfig {
            sizes: vec![3, 17],
            ..VerifyConfig::default()
        }
    }

    #[test]
    fn test_software_backend_passes() {
        let verifier = Verifier::new(small_config(), Dispatcher::software()).unwrap();
        let report = verifier.run().unwrap();
        assert_eq!(report.cases().len(), 2 * 4);
        assert!(report.all_passed(), "{:?}", report.failures());
        for case in report.cases() {
            assert_eq!(case.runs.len(), 3);
        }
    }

    #[test]
    fn test_wrapping_backend_is_caught() {
        let config = VerifyConfig {
            sizes: vec![16],
            dtypes: vec![DType::I8, DType::F32],
            strategies: vec![Strategy::Naive, Strategy::Vectorized],
            ..VerifyConfig::default()
        };
        let verifier = Verifier::new(config, Dispatcher::new(Box::new(WrappingKernels))).unwrap();
        let report = verifier.run().unwrap();

        assert_eq!(report.failures(), vec![(DType::I8, 16, Strategy::Naive)]);
        let i8_case = &report.cases()[0];
        assert_eq!(
            i8_case.run(Strategy::Vectorized).unwrap().outcome,
            Outcome::Unsupported
        );
        let f32_case = &report.cases()[1];
        assert!(f32_case
            .runs
            .iter()
            .all(|r| r.outcome == Outcome::Unsupported));
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let run = || {
            Verifier::new(small_config(), Dispatcher::software())
                .unwrap()
                .run()
                .unwrap()
        };
        let (first, second) = (run(), run());
        let outcomes = |r: &VerificationReport| -> Vec<Outcome> {
            r.cases()
                .iter()
                .flat_map(|c| c.runs.iter().map(|run| run.outcome))
                .collect()
        };
        assert_eq!(outcomes(&first), outcomes(&second));
    }

    #[test]
    fn test_compare_with_explicit_operands() {
        let verifier = Verifier::new(VerifyConfig::default(), Dispatcher::software()).unwrap();
        let a = Matrix::from_vec(1, 1, vec![100i8]).unwrap();
        let case = verifier.compare(&a, &a, 0).unwrap();
        assert!(case.passed());
        assert_eq!(case.dtype, DType::I8);
        assert_eq!(case.size, 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = VerifyConfig {
            sizes: vec![],
            ..VerifyConfig::default()
        };
        assert!(Verifier::new(config, Dispatcher::software()).is_err());
    }

    /// Software kernels that remember every width the float vectorized
    /// operation receives.
    #[derive(Debug, Default)]
    struct WidthRecorder {
        seen: Arc<Mutex<Vec<VectorWidth>>>,
    }

    impl KernelBackend for WidthRecorder {
        fn name(&self) -> &str {
            "width-recorder"
        }

        fn vectorized_f32(&self, call: GemmCall<'_, f32>, width: VectorWidth) -> sm_matrix::Result<()> {
            self.seen.lock().unwrap().push(width);
            SoftwareKernels::new().vectorized_f32(call, width)
        }
    }

    #[test]
    fn test_width_is_forwarded() {
        let config = VerifyConfig {
            sizes: vec![9, 40],
            dtypes: vec![DType::F32],
            strategies: vec![Strategy::Vectorized],
            vector_width: VectorWidth::bits(24),
            ..VerifyConfig::default()
        };
        let recorder = WidthRecorder::default();
        let seen = Arc::clone(&recorder.seen);
        let report = Verifier::new(config, Dispatcher::new(Box::new(recorder)))
            .unwrap()
            .run()
            .unwrap();

        assert!(report.all_passed());
        assert_eq!(*seen.lock().unwrap(), vec![VectorWidth::bits(24); 2]);
    }
}
