//! Monte Carlo dispersion runs.
//!
//! A batch is embarrassingly parallel: each replica owns its model, state,
//! stepper, and storage, and nothing mutable is shared. Sampling happens
//! sequentially from one seeded rng so a batch is reproducible; the solves
//! then fan out across threads.

use indicatif::ProgressBar;
use rand::{Rng, SeedableRng, rngs::SmallRng};
use rayon::prelude::*;
use uncertainty::Uncertainty;

use crate::{
    OdeModel,
    error::OdeError,
    events::EventManager,
    saving::{MemoryResult, ResultStorage},
    solvers::{OdeSolver, SolverMethod},
    state::OdeState,
    stepping::AdaptiveStepControl,
};

/// A dispersed problem: a model builder, a replica count, and the seed that
/// makes the batch reproducible.
pub struct MonteCarloProblem<ModelBuilder> {
    model_builder: ModelBuilder,
    nruns: usize,
    seed: u64,
}

impl<ModelBuilder> MonteCarloProblem<ModelBuilder>
where
    ModelBuilder: Uncertainty,
{
    pub fn new(model_builder: ModelBuilder, nruns: usize) -> Self {
        let seed = rand::rng().random::<u64>();
        Self { model_builder, nruns, seed }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Batch driver: one method applied to every replica.
#[derive(Clone, Copy)]
pub struct MonteCarloSolver {
    method: SolverMethod,
}

impl MonteCarloSolver {
    pub fn new(method: SolverMethod) -> Self {
        Self { method }
    }

    /// Samples `nruns` (model, initial state) replicas and solves each with
    /// adaptive stepping. Results come back in replica order.
    pub fn solve_adaptive<ModelBuilder, StateBuilder, State>(
        &self,
        problem: &MonteCarloProblem<ModelBuilder>,
        x0: &StateBuilder,
        tspan: (f64, f64),
        control: AdaptiveStepControl,
    ) -> Result<Vec<MemoryResult<State>>, OdeError>
    where
        ModelBuilder: Uncertainty,
        ModelBuilder::Output: OdeModel<State = State> + Send,
        StateBuilder: Uncertainty<Output = State>,
        State: OdeState,
    {
        let replicas = self.sample(problem, x0)?;
        let progress = ProgressBar::new(problem.nruns as u64);

        let results = replicas
            .into_par_iter()
            .map(|(mut model, x0)| {
                let mut solver = OdeSolver::new(self.method);
                let mut control = control;
                let mut events = EventManager::new();
                let mut storage = ResultStorage::Memory(MemoryResult::new(64));

                solver.solve_adaptive(
                    &mut model,
                    &x0,
                    tspan,
                    &mut control,
                    &mut events,
                    &mut storage,
                    None,
                )?;
                storage.finish()?;
                progress.inc(1);

                match storage.into_memory() {
                    Some(result) => Ok(result),
                    None => unreachable!("storage was constructed as the memory variant"),
                }
            })
            .collect();

        progress.finish_and_clear();
        results
    }

    /// Fixed-step variant of [`MonteCarloSolver::solve_adaptive`].
    pub fn solve_fixed<ModelBuilder, StateBuilder, State>(
        &self,
        problem: &MonteCarloProblem<ModelBuilder>,
        x0: &StateBuilder,
        tspan: (f64, f64),
        dt: f64,
    ) -> Result<Vec<MemoryResult<State>>, OdeError>
    where
        ModelBuilder: Uncertainty,
        ModelBuilder::Output: OdeModel<State = State> + Send,
        StateBuilder: Uncertainty<Output = State>,
        State: OdeState,
    {
        let replicas = self.sample(problem, x0)?;
        let progress = ProgressBar::new(problem.nruns as u64);
        let capacity = ((tspan.1 - tspan.0) / dt).ceil() as usize + 1;

        let results = replicas
            .into_par_iter()
            .map(|(mut model, x0)| {
                let mut solver = OdeSolver::new(self.method);
                let mut events = EventManager::new();
                let mut storage = ResultStorage::Memory(MemoryResult::new(capacity));

                solver.solve_fixed(
                    &mut model,
                    &x0,
                    tspan,
                    dt,
                    &mut events,
                    &mut storage,
                    None,
                )?;
                storage.finish()?;
                progress.inc(1);

                match storage.into_memory() {
                    Some(result) => Ok(result),
                    None => unreachable!("storage was constructed as the memory variant"),
                }
            })
            .collect();

        progress.finish_and_clear();
        results
    }

    fn sample<ModelBuilder, StateBuilder, State>(
        &self,
        problem: &MonteCarloProblem<ModelBuilder>,
        x0: &StateBuilder,
    ) -> Result<Vec<(ModelBuilder::Output, State)>, OdeError>
    where
        ModelBuilder: Uncertainty,
        StateBuilder: Uncertainty<Output = State>,
    {
        let mut rng = SmallRng::seed_from_u64(problem.seed);
        let mut replicas = Vec::with_capacity(problem.nruns);
        for _ in 0..problem.nruns {
            let model = problem.model_builder.sample(false, &mut rng)?;
            let state = x0.sample(false, &mut rng)?;
            replicas.push((model, state));
        }
        Ok(replicas)
    }
}
