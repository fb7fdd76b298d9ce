use std::f64::consts::PI;

use zenith_diffeq::{
    ModelError, OdeModel, OdeProblem, solvers::SolverMethod, state::StateArray,
    stepping::AdaptiveStepControl,
};

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

fn main() {
    let mut problem = OdeProblem::new(HarmonicOscillator);
    let control = AdaptiveStepControl::default()
        .with_rel_tol(1e-9)
        .with_abs_tol(1e-9);

    // one full period
    let solution = problem
        .solve_dense(
            &StateArray::new([1.0, 0.0]),
            (0.0, 2.0 * PI),
            control,
            SolverMethod::Dopri8,
        )
        .expect("integration failed");

    println!("accepted steps: {}", solution.segments().len());

    // query on a grid much finer than the accepted steps
    let (ts, ys) = solution.sample_uniform(PI / 8.0);
    for (t, y) in ts.iter().zip(&ys) {
        println!(
            "t = {t:7.4}, y = [{:9.6}, {:9.6}]  ref = [{:9.6}, {:9.6}]",
            y[0],
            y[1],
            t.cos(),
            -t.sin()
        );
    }
}
