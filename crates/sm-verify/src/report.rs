use std::time::Duration;

use sm_matrix::{DType, Strategy};

/// How one strategy fared against the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Output equal to the reference within the comparison epsilon.
    Passed,
    /// Output differs from the reference.
    Mismatch,
    /// The backend has no kernel for this element type and strategy.
    Unsupported,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyRun {
    pub strategy: Strategy,
    pub outcome: Outcome,
    /// Wall time of the multiplication alone. Zero when unsupported.
    pub elapsed: Duration,
}

/// Every strategy run on one pair of `size x size` operands.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseReport {
    pub dtype: DType,
    pub size: usize,
    /// Time taken by the reference strategy on the same operands.
    pub reference_elapsed: Duration,
    pub runs: Vec<StrategyRun>,
}

impl CaseReport {
    pub fn passed(&self) -> bool {
        self.runs.iter().all(|r| r.outcome != Outcome::Mismatch)
    }

    pub fn run(&self, strategy: Strategy) -> Option<&StrategyRun> {
        self.runs.iter().find(|r| r.strategy == strategy)
    }

    /// How much faster `strategy` ran than the reference, in percent.
    ///
    /// `None` if the strategy was not run or is unsupported; 0 when its
    /// time is too small to measure.
    pub fn speedup_percent(&self, strategy: Strategy) -> Option<f64> {
        let run = self.run(strategy)?;
        if run.outcome == Outcome::Unsupported {
            return None;
        }
        let t = run.elapsed.as_secs_f64();
        if t > 1e-9 {
            Some((self.reference_elapsed.as_secs_f64() / t - 1.0) * 100.0)
        } else {
            Some(0.0)
        }
    }
}

/// Result of a whole verification run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerificationReport {
    cases: Vec<CaseReport>,
}

impl VerificationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, case: CaseReport) {
        self.cases.push(case);
    }

    pub fn cases(&self) -> &[CaseReport] {
        &self.cases
    }

    /// True when no strategy disagreed with the reference. Unsupported
    /// strategies do not count as failures.
    pub fn all_passed(&self) -> bool {
        self.cases.iter().all(CaseReport::passed)
    }

    /// `(dtype, size, strategy)` of every mismatch.
    pub fn failures(&self) -> Vec<(DType, usize, Strategy)> {
        self.cases
            .iter()
            .flat_map(|case| {
                case.runs
                    .iter()
                    .filter(|r| r.outcome == Outcome::Mismatch)
                    .map(move |r| (case.dtype, case.size, r.strategy))
            })
            .collect()
    }
}
