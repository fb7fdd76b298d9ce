use rand::Rng;
use uncertainty::{UncertainValue, Uncertainty, UncertaintyError};
use zenith_diffeq::{
    ModelError, OdeModel,
    monte_carlo::{MonteCarloProblem, MonteCarloSolver},
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

struct DecayBuilder {
    rate: UncertainValue,
}

impl Uncertainty for DecayBuilder {
    type Output = Decay;

    fn sample<R: Rng>(&self, nominal: bool, rng: &mut R) -> Result<Decay, UncertaintyError> {
        Ok(Decay { rate: self.rate.sample(nominal, rng)? })
    }
}

struct InitialState {
    x: UncertainValue,
}

impl Uncertainty for InitialState {
    type Output = StateArray<1>;

    fn sample<R: Rng>(
        &self,
        nominal: bool,
        rng: &mut R,
    ) -> Result<StateArray<1>, UncertaintyError> {
        Ok(StateArray::new([self.x.sample(nominal, rng)?]))
    }
}

fn main() {
    let builder = DecayBuilder { rate: UncertainValue::new_normal(1.0, 0.05) };
    let x0 = InitialState { x: UncertainValue::new_normal(1.0, 0.01) };

    let problem = MonteCarloProblem::new(builder, 256).with_seed(1234);
    let solver = MonteCarloSolver::new(SolverMethod::Dopri8);
    let control = AdaptiveStepControl::default()
        .with_rel_tol(1e-8)
        .with_abs_tol(1e-10);

    let results = solver
        .solve_adaptive(&problem, &x0, (0.0, 2.0), control)
        .expect("batch failed");

    let finals: Vec<f64> = results
        .iter()
        .filter_map(|run| run.last().map(|(_, y)| y[0]))
        .collect();
    let mean = finals.iter().sum::<f64>() / finals.len() as f64;
    let variance =
        finals.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / finals.len() as f64;

    println!("runs: {}", finals.len());
    println!("mean final state: {mean:.6}");
    println!("std  final state: {:.6}", variance.sqrt());
}
