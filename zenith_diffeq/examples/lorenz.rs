use zenith_diffeq::{
    ModelError, OdeModel, OdeProblem,
    saving::{ResultStorage, SaveMethod},
    solvers::SolverMethod,
    state::StateArray,
};

#[derive(Debug)]
struct Lorenz {
    sigma: f64,
    rho: f64,
    beta: f64,
}

impl OdeModel for Lorenz {
    type State = StateArray<3>;

    fn f(&mut self, _t: f64, x: &Self::State, dx: &mut Self::State) -> Result<(), ModelError> {
        dx[0] = self.sigma * (x[1] - x[0]);
        dx[1] = x[0] * (self.rho - x[2]) - x[1];
        dx[2] = x[0] * x[1] - self.beta * x[2];
        Ok(())
    }
}

fn main() {
    let model = Lorenz { sigma: 10., rho: 28., beta: 8. / 3. };
    let mut problem = OdeProblem::new(model);

    let x0 = StateArray::new([1.0, 0.0, 0.0]);
    let result = problem
        .solve_fixed(&x0, (0.0, 30.0), 0.001, SolverMethod::Dopri8, SaveMethod::Memory)
        .expect("integration failed");

    if let ResultStorage::Memory(result) = result {
        for i in 0..result.t.len() {
            if result.t[i] - result.t[i].floor() < 1e-4 {
                println!(
                    "{:10.6}     {:10.6}     {:10.6}     {:10.6}",
                    result.t[i], result.y[i][0], result.y[i][1], result.y[i][2]
                );
            }
        }
    }
}
