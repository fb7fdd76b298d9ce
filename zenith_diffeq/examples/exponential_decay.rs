use zenith_diffeq::{
    ModelError, OdeModel, OdeProblem,
    saving::{ResultStorage, SaveMethod},
    solvers::SolverMethod,
    state::StateArray,
    stepping::AdaptiveStepControl,
};

#[derive(Debug)]
struct Decay {
    rate: f64,
}

impl OdeModel for Decay {
    type State = StateArray<1>;

    fn f(&mut self, _t: f64, y: &Self::State, dydt: &mut Self::State) -> Result<(), ModelError> {
        dydt[0] = -self.rate * y[0];
        Ok(())
    }
}

fn main() {
    let mut problem = OdeProblem::new(Decay { rate: 1.0 });
    let control = AdaptiveStepControl::default()
        .with_rel_tol(1e-10)
        .with_abs_tol(1e-12);

    let result = problem
        .solve_adaptive(
            &StateArray::new([1.0]),
            (0.0, 5.0),
            control,
            SolverMethod::Dopri8,
            SaveMethod::Memory,
        )
        .expect("integration failed");

    if let ResultStorage::Memory(result) = result {
        for (t, y) in result.t.iter().zip(&result.y) {
            println!("{t:10.6}  {:14.10}  (exact {:14.10})", y[0], (-t).exp());
        }
    }
}
