//! Error-norm conventions shared by the adaptive ODE solvers.
//!
//! The solvers measure a step's error estimate against a scale built from
//! absolute and relative tolerances, component by component, and accept the
//! step when the combined norm is at most 1.

use serde::{Deserialize, Serialize};

/// Tolerance pair for a single state component.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Tolerances {
    pub rel_tol: f64,
    pub abs_tol: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self { rel_tol: 1e-3, abs_tol: 1e-6 }
    }
}

impl Tolerances {
    pub fn new(rel_tol: f64, abs_tol: f64) -> Self {
        Self { rel_tol, abs_tol }
    }

    /// Scaled error of one component over a step from `y0` to `y1`.
    pub fn compute_error(&self, y0: f64, y1: f64, err: f64) -> f64 {
        compute_error(y0, y1, err, self.rel_tol, self.abs_tol)
    }
}

/// Error-norm model associated with a state type.
///
/// Implementations return the normalized root-mean-square error over all
/// components, where each component's error estimate is divided by
/// `abs_tol + rel_tol * max(|y0_i|, |y1_i|)`. A result of at most 1 means
/// the step satisfied the tolerances.
pub trait Tolerance: Default {
    type State;

    fn compute_error(
        &self,
        y0: &Self::State,
        y1: &Self::State,
        err: &Self::State,
        rel_tol: f64,
        abs_tol: f64,
    ) -> f64;
}

/// Scaled error of a single component.
pub fn compute_error(y0: f64, y1: f64, err: f64, rel_tol: f64, abs_tol: f64) -> f64 {
    let scale = abs_tol + rel_tol * y0.abs().max(y1.abs());
    (err / scale).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_scales_with_tolerances() {
        // err of 1e-6 against abs_tol 1e-6 and no state magnitude is exactly 1
        let e = compute_error(0.0, 0.0, 1e-6, 1e-3, 1e-6);
        assert!((e - 1.0).abs() < 1e-12);

        // larger states relax the scale through the relative term
        let e = compute_error(100.0, 100.0, 1e-6, 1e-3, 1e-6);
        assert!(e < 1e-4);
    }

    #[test]
    fn uses_larger_endpoint_for_relative_scale() {
        let grow = compute_error(1.0, 1000.0, 1.0, 1e-3, 0.0);
        let shrink = compute_error(1000.0, 1.0, 1.0, 1e-3, 0.0);
        assert_eq!(grow, shrink);
    }

    #[test]
    fn tolerances_default_matches_free_function() {
        let tol = Tolerances::default();
        assert_eq!(
            tol.compute_error(2.0, 3.0, 0.5),
            compute_error(2.0, 3.0, 0.5, 1e-3, 1e-6)
        );
    }
}
