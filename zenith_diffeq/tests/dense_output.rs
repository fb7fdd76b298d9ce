//! Properties of the per-step interpolant and the piecewise dense solution.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use zenith_diffeq::{
    ModelError, OdeModel, OdeProblem,
    solvers::{Dopri8Dense, SolverMethod},
    state::StateArray,
    stepping::AdaptiveStepControl,
};

#[derive(Debug)]
struct Decay;

impl OdeModel for Decay {
    type State = StateArray<1>;

    fn f(&mut self, _t: f64, y: &Self::State, dydt: &mut Self::State) -> Result<(), ModelError> {
        dydt[0] = -y[0];
        Ok(())
    }
}

#[derive(Debug)]
struct HarmonicOscillator;

impl OdeModel for HarmonicOscillator {
    type State = StateArray<2>;

    fn f(&mut self, _t: f64, y: &Self::State, dydt: &mut Self::State) -> Result<(), ModelError> {
        dydt[0] = y[1];
        dydt[1] = -y[0];
        Ok(())
    }
}

fn decay_solution() -> Dopri8Dense<StateArray<1>> {
    let mut problem = OdeProblem::new(Decay);
    let control = AdaptiveStepControl::default()
        .with_rel_tol(1e-10)
        .with_abs_tol(1e-12);
    problem
        .solve_dense(&StateArray::new([1.0]), (0.0, 2.0), control, SolverMethod::Dopri8)
        .unwrap()
}

#[test]
fn left_endpoints_are_bitwise_exact() {
    let solution = decay_solution();
    assert!(solution.segments().len() > 1);
    for segment in solution.segments() {
        // the interpolating polynomial vanishes at the step start, so the
        // start state comes back untouched
        assert_eq!(segment.evaluate(segment.t0())[0], segment.y0()[0]);
    }
}

#[test]
fn segments_chain_continuously() {
    let solution = decay_solution();
    for pair in solution.segments().windows(2) {
        let left = pair[0].evaluate(pair[0].t1())[0];
        let right = pair[1].evaluate(pair[1].t0())[0];
        assert_abs_diff_eq!(left, right, epsilon = 1e-13);
    }
}

#[test]
fn endpoint_derivatives_match_the_vector_field() {
    let solution = decay_solution();
    for segment in solution.segments() {
        // dy/dt = -y at both ends of every step
        let d0 = segment.derivative(segment.t0())[0];
        assert_relative_eq!(d0, -segment.y0()[0], max_relative = 1e-10);

        let y1 = segment.evaluate(segment.t1())[0];
        let d1 = segment.derivative(segment.t1())[0];
        assert_relative_eq!(d1, -y1, max_relative = 1e-8);
    }
}

#[test]
fn interpolation_tracks_the_analytic_solution() {
    let solution = decay_solution();
    let (start, end) = solution.span().unwrap();
    assert_eq!(start, 0.0);
    assert_eq!(end, 2.0);

    // the interpolant is a lower order than the step, so mid-step queries
    // sit a little above the endpoint accuracy
    for i in 0..=100 {
        let t = 2.0 * i as f64 / 100.0;
        let y = solution.evaluate(t).unwrap();
        assert_relative_eq!(y[0], (-t).exp(), max_relative = 1e-7);
    }
    assert!(solution.evaluate(-0.1).is_none());
    assert!(solution.evaluate(2.1).is_none());
}

#[test]
fn increment_queries_match_separate_evaluations() {
    let solution = decay_solution();
    for segment in solution.segments() {
        let (t0, t1) = (segment.t0(), segment.t1());
        let h = t1 - t0;
        for (fa, fb) in [(0.0, 1.0), (0.25, 0.75), (0.4, 0.45), (0.9, 1.0)] {
            let a = t0 + fa * h;
            let b = t0 + fb * h;
            let separate = segment.evaluate(b)[0] - segment.evaluate(a)[0];
            let together = segment.evaluate_between(a, b)[0];
            assert_abs_diff_eq!(together, separate, epsilon = 1e-13);
        }
    }
}

#[test]
fn derivative_matches_finite_differences() {
    let solution = decay_solution();
    let segment = &solution.segments()[0];
    let (t0, t1) = (segment.t0(), segment.t1());
    let delta = 1e-6 * (t1 - t0);

    for frac in [0.1, 0.3, 0.5, 0.7, 0.9] {
        let t = t0 + frac * (t1 - t0);
        let numeric =
            (segment.evaluate(t + delta)[0] - segment.evaluate(t - delta)[0]) / (2.0 * delta);
        let analytic = segment.derivative(t)[0];
        assert_relative_eq!(analytic, numeric, max_relative = 1e-6);
    }
}

#[test]
fn extrapolation_outside_a_step_does_not_fail() {
    let solution = decay_solution();
    let segment = &solution.segments()[0];
    let h = segment.t1() - segment.t0();
    // a little beyond either end is permitted and still close for a smooth
    // problem
    let y = segment.evaluate(segment.t1() + 0.05 * h);
    assert_relative_eq!(y[0], (-(segment.t1() + 0.05 * h)).exp(), max_relative = 1e-6);
}

#[test]
fn dense_oscillator_grid_matches_sin_and_cos() {
    let mut problem = OdeProblem::new(HarmonicOscillator);
    let control = AdaptiveStepControl::default()
        .with_rel_tol(1e-9)
        .with_abs_tol(1e-9);
    let solution = problem
        .solve_dense(
            &StateArray::new([1.0, 0.0]),
            (0.0, 2.0 * std::f64::consts::PI),
            control,
            SolverMethod::Dopri8,
        )
        .unwrap();

    let (ts, ys) = solution.sample_uniform(0.05);
    assert!(ts.len() > 100);
    for (t, y) in ts.iter().zip(&ys) {
        assert_abs_diff_eq!(y[0], t.cos(), epsilon = 1e-6);
        assert_abs_diff_eq!(y[1], -t.sin(), epsilon = 1e-6);
    }
}
