use thiserror::Error;

/// Shape violations caught while assembling a Butcher tableau.
#[derive(Debug, Error, PartialEq)]
pub enum InvalidTableau {
    #[error("a method needs at least one stage")]
    NoStages,
    #[error("expected {expected} time fractions, got {found}")]
    TimeFractionCount { expected: usize, found: usize },
    #[error("expected {expected} stage weight rows, got {found}")]
    StageRowCount { expected: usize, found: usize },
    #[error("stage {stage} weight row has {found} entries, expected {expected}")]
    StageRowLength { stage: usize, expected: usize, found: usize },
    #[error("expected {expected} solution weights, got {found}")]
    SolutionWeightCount { expected: usize, found: usize },
    #[error("expected {expected} error weights, got {found}")]
    ErrorWeightCount { expected: usize, found: usize },
    #[error("stage {stage} weights sum to {row_sum}, expected time fraction {expected}")]
    InconsistentRow { stage: usize, row_sum: f64, expected: f64 },
    #[error("solution weights sum to {sum}, expected 1")]
    SolutionWeightSum { sum: f64 },
}

/// Coefficients of one explicit embedded Runge-Kutta method.
///
/// The first stage is always evaluated at the step start, so `time_fractions`
/// carries one entry per remaining stage. `stage_weights` is the lower
/// triangle of the tableau: row `i` (0-based) combines the `i + 1` stage
/// derivatives computed before stage `i + 1`. `solution_weights` forms the
/// advancing solution; `error_weights` is the difference between the
/// advancing and embedded weight rows, so contracting it against the stage
/// derivatives yields the error estimate directly.
///
/// Constructed once per method from published constants and shared read-only
/// by every integration that uses the method.
#[derive(Clone, Debug)]
pub struct ButcherTableau {
    stages: usize,
    time_fractions: Box<[f64]>,
    stage_weights: Box<[Box<[f64]>]>,
    solution_weights: Box<[f64]>,
    error_weights: Box<[f64]>,
}

impl ButcherTableau {
    /// Tolerance for the row-sum consistency conditions. Published
    /// coefficients are exact rationals; anything worse than this is a
    /// transcription error, not roundoff.
    pub const CONSISTENCY_TOL: f64 = 1e-12;

    pub fn new(
        stages: usize,
        time_fractions: Vec<f64>,
        stage_weights: Vec<Vec<f64>>,
        solution_weights: Vec<f64>,
        error_weights: Vec<f64>,
    ) -> Result<Self, InvalidTableau> {
        if stages == 0 {
            return Err(InvalidTableau::NoStages);
        }
        if time_fractions.len() != stages - 1 {
            return Err(InvalidTableau::TimeFractionCount {
                expected: stages - 1,
                found: time_fractions.len(),
            });
        }
        if stage_weights.len() != stages - 1 {
            return Err(InvalidTableau::StageRowCount {
                expected: stages - 1,
                found: stage_weights.len(),
            });
        }
        for (i, row) in stage_weights.iter().enumerate() {
            if row.len() != i + 1 {
                return Err(InvalidTableau::StageRowLength {
                    stage: i + 1,
                    expected: i + 1,
                    found: row.len(),
                });
            }
        }
        if solution_weights.len() != stages {
            return Err(InvalidTableau::SolutionWeightCount {
                expected: stages,
                found: solution_weights.len(),
            });
        }
        if error_weights.len() != stages {
            return Err(InvalidTableau::ErrorWeightCount {
                expected: stages,
                found: error_weights.len(),
            });
        }

        let tableau = Self {
            stages,
            time_fractions: time_fractions.into_boxed_slice(),
            stage_weights: stage_weights
                .into_iter()
                .map(Vec::into_boxed_slice)
                .collect(),
            solution_weights: solution_weights.into_boxed_slice(),
            error_weights: error_weights.into_boxed_slice(),
        };

        #[cfg(debug_assertions)]
        tableau.check_consistency(Self::CONSISTENCY_TOL)?;

        Ok(tableau)
    }

    /// Verifies the row-sum conditions against the stage time fractions and
    /// that the solution weights form an affine combination. Catches
    /// transcription errors in published coefficient tables.
    pub fn check_consistency(&self, tol: f64) -> Result<(), InvalidTableau> {
        for (i, row) in self.stage_weights.iter().enumerate() {
            let row_sum: f64 = row.iter().sum();
            let expected = self.time_fractions[i];
            if (row_sum - expected).abs() > tol {
                return Err(InvalidTableau::InconsistentRow {
                    stage: i + 1,
                    row_sum,
                    expected,
                });
            }
        }
        let sum: f64 = self.solution_weights.iter().sum();
        if (sum - 1.0).abs() > tol {
            return Err(InvalidTableau::SolutionWeightSum { sum });
        }
        Ok(())
    }

    /// Number of stage derivatives evaluated per step.
    pub fn stages(&self) -> usize {
        self.stages
    }

    /// Fraction of the step at which stage `stage` is evaluated. Stage 0 is
    /// the step start.
    pub fn time_fraction(&self, stage: usize) -> f64 {
        if stage == 0 {
            0.0
        } else {
            self.time_fractions[stage - 1]
        }
    }

    /// Weights combining stage derivatives `0..stage` into the state at
    /// which stage `stage` is evaluated. Only valid for `stage >= 1`.
    pub fn stage_row(&self, stage: usize) -> &[f64] {
        &self.stage_weights[stage - 1]
    }

    pub fn solution_weights(&self) -> &[f64] {
        &self.solution_weights
    }

    pub fn error_weights(&self) -> &[f64] {
        &self.error_weights
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn midpoint_pair() -> (Vec<f64>, Vec<Vec<f64>>, Vec<f64>, Vec<f64>) {
        // explicit midpoint with an Euler error estimate
        (
            vec![0.5],
            vec![vec![0.5]],
            vec![0.0, 1.0],
            vec![-1.0, 1.0],
        )
    }

    #[test]
    fn accepts_a_consistent_tableau() {
        let (c, a, b, e) = midpoint_pair();
        let tableau = ButcherTableau::new(2, c, a, b, e).unwrap();
        assert_eq!(tableau.stages(), 2);
        assert_eq!(tableau.time_fraction(0), 0.0);
        assert_eq!(tableau.time_fraction(1), 0.5);
        assert_eq!(tableau.stage_row(1), &[0.5]);
    }

    #[test]
    fn rejects_zero_stages() {
        let err =
            ButcherTableau::new(0, Vec::new(), Vec::new(), Vec::new(), Vec::new()).unwrap_err();
        assert_eq!(err, InvalidTableau::NoStages);
    }

    #[test]
    fn rejects_wrong_time_fraction_count() {
        let (_, a, b, e) = midpoint_pair();
        let err = ButcherTableau::new(2, vec![0.5, 0.7], a, b, e).unwrap_err();
        assert_eq!(
            err,
            InvalidTableau::TimeFractionCount { expected: 1, found: 2 }
        );
    }

    #[test]
    fn rejects_ragged_stage_rows() {
        let (c, _, b, e) = midpoint_pair();
        let err = ButcherTableau::new(2, c, vec![vec![0.25, 0.25]], b, e).unwrap_err();
        assert_eq!(
            err,
            InvalidTableau::StageRowLength { stage: 1, expected: 1, found: 2 }
        );
    }

    #[test]
    fn rejects_wrong_solution_weight_count() {
        let (c, a, _, e) = midpoint_pair();
        let err = ButcherTableau::new(2, c, a, vec![1.0], e).unwrap_err();
        assert_eq!(
            err,
            InvalidTableau::SolutionWeightCount { expected: 2, found: 1 }
        );
    }

    #[test]
    fn rejects_wrong_error_weight_count() {
        let (c, a, b, _) = midpoint_pair();
        let err = ButcherTableau::new(2, c, a, b, vec![1.0]).unwrap_err();
        assert_eq!(err, InvalidTableau::ErrorWeightCount { expected: 2, found: 1 });
    }

    #[test]
    fn consistency_check_catches_a_bad_row() {
        let tableau = ButcherTableau::new(
            2,
            vec![0.5],
            vec![vec![0.4]],
            vec![0.0, 1.0],
            vec![-1.0, 1.0],
        );
        // debug builds catch it at construction; release builds on demand
        match tableau {
            Ok(tableau) => {
                let err = tableau
                    .check_consistency(ButcherTableau::CONSISTENCY_TOL)
                    .unwrap_err();
                assert!(matches!(err, InvalidTableau::InconsistentRow { stage: 1, .. }));
            }
            Err(err) => {
                assert!(matches!(err, InvalidTableau::InconsistentRow { stage: 1, .. }));
            }
        }
    }

    #[test]
    fn consistency_check_catches_bad_solution_weights() {
        let tableau = ButcherTableau::new(
            2,
            vec![0.5],
            vec![vec![0.5]],
            vec![0.1, 1.0],
            vec![-1.0, 1.0],
        );
        match tableau {
            Ok(tableau) => {
                let err = tableau
                    .check_consistency(ButcherTableau::CONSISTENCY_TOL)
                    .unwrap_err();
                assert!(matches!(err, InvalidTableau::SolutionWeightSum { .. }));
            }
            Err(err) => {
                assert!(matches!(err, InvalidTableau::SolutionWeightSum { .. }));
            }
        }
    }
}
