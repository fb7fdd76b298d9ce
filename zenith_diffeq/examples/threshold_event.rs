use zenith_diffeq::{
    ModelError, OdeModel, OdeProblem,
    events::{ContinuousEvent, EventAction},
    saving::{ResultStorage, SaveMethod},
    solvers::SolverMethod,
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

fn main() {
    // stop when the state decays through one half; the crossing lands at
    // ln 2 regardless of where the accepted steps fall
    let event = ContinuousEvent::new(
        |_t, y: &StateArray<1>| y[0] - 0.5,
        |_model: &mut Decay, t, y| {
            println!("crossed 0.5 at t = {t:.12} (y = {:.12})", y[0]);
            EventAction::Terminate
        },
    );

    let mut problem = OdeProblem::new(Decay).with_continuous_event(event);
    let control = AdaptiveStepControl::default()
        .with_rel_tol(1e-10)
        .with_abs_tol(1e-12);

    let result = problem
        .solve_adaptive(
            &StateArray::new([1.0]),
            (0.0, 10.0),
            control,
            SolverMethod::Dopri8,
            SaveMethod::Memory,
        )
        .expect("integration failed");

    if let ResultStorage::Memory(result) = result {
        if let Some((t, y)) = result.last() {
            println!("stopped at t = {t:.12}, y = {:.12}", y[0]);
            println!("ln 2        = {:.12}", std::f64::consts::LN_2);
        }
    }
}
