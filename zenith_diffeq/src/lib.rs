//! High-order explicit Runge-Kutta integration with embedded error
//! estimation and dense output.
//!
//! The engine is split the way the math is: a [`tableau::ButcherTableau`]
//! holds a method's coefficients, [`rk::RungeKutta`] runs the stage
//! algorithm for any tableau and any vector-space state, and
//! [`dense::DenseOutput`] turns one step's stage derivatives into a
//! continuous solution over that step. Adaptive stepping, events, saving,
//! and Monte Carlo dispersion are layered on top of those three.

use std::fmt::Debug;

pub mod dense;
pub mod dopri8;
pub mod error;
pub mod events;
pub mod monte_carlo;
pub mod rk;
pub mod saving;
pub mod solvers;
pub mod state;
pub mod stepping;
pub mod tableau;

pub use error::{ModelError, OdeError};

use crate::events::{ContinuousEvent, EventManager, PeriodicEvent};
use crate::saving::{ResultStorage, SaveMethod};
use crate::solvers::{Dopri8Dense, OdeSolver, SolverMethod};
use crate::state::OdeState;
use crate::stepping::{AdaptiveStepControl, StepMethod};

/// A dynamical system the solvers can integrate.
///
/// `f` computes the time derivative of the state, writing into a buffer the
/// solver owns. It must be a pure function of `(t, y)`: the stepper
/// evaluates it at trial states that are discarded when a step is rejected.
pub trait OdeModel: Debug {
    type State: OdeState;

    fn f(&mut self, t: f64, y: &Self::State, dydt: &mut Self::State) -> Result<(), ModelError>;
}

/// A model plus everything registered around it: events and output.
pub struct OdeProblem<Model, State>
where
    Model: OdeModel<State = State>,
    State: OdeState,
{
    model: Model,
    events: EventManager<Model, State>,
}

impl<Model, State> OdeProblem<Model, State>
where
    Model: OdeModel<State = State>,
    State: OdeState,
{
    pub fn new(model: Model) -> Self {
        Self { model, events: EventManager::new() }
    }

    pub fn with_periodic_event(mut self, event: PeriodicEvent<Model, State>) -> Self {
        self.events.add_periodic(event);
        self
    }

    pub fn with_continuous_event(mut self, event: ContinuousEvent<Model, State>) -> Self {
        self.events.add_continuous(event);
        self
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn into_model(self) -> Model {
        self.model
    }

    /// Integrates with whichever step control the caller configured.
    pub fn solve(
        &mut self,
        x0: &State,
        tspan: (f64, f64),
        step_method: StepMethod,
        method: SolverMethod,
        save_method: SaveMethod,
    ) -> Result<ResultStorage<State>, OdeError> {
        match step_method {
            StepMethod::Fixed(fixed) => {
                self.solve_fixed(x0, tspan, fixed.dt, method, save_method)
            }
            StepMethod::Adaptive(control) => {
                self.solve_adaptive(x0, tspan, control, method, save_method)
            }
        }
    }

    /// Integrates with adaptive step control, saving `x0` and every
    /// accepted step.
    pub fn solve_adaptive(
        &mut self,
        x0: &State,
        tspan: (f64, f64),
        control: AdaptiveStepControl,
        method: SolverMethod,
        save_method: SaveMethod,
    ) -> Result<ResultStorage<State>, OdeError> {
        let mut control = control;
        let capacity = match control.max_dt {
            Some(max_dt) => ((tspan.1 - tspan.0) / max_dt).ceil() as usize,
            None => (tspan.1 - tspan.0).ceil() as usize,
        };
        let mut storage = ResultStorage::for_method(&save_method, capacity, x0)?;
        let mut solver = OdeSolver::new(method);

        solver.solve_adaptive(
            &mut self.model,
            x0,
            tspan,
            &mut control,
            &mut self.events,
            &mut storage,
            None,
        )?;

        storage.finish()?;
        Ok(storage)
    }

    /// Integrates with adaptive step control and returns the piecewise
    /// dense solution, queryable at any time in the covered span.
    pub fn solve_dense(
        &mut self,
        x0: &State,
        tspan: (f64, f64),
        control: AdaptiveStepControl,
        method: SolverMethod,
    ) -> Result<Dopri8Dense<State>, OdeError> {
        let mut control = control;
        let mut storage = ResultStorage::None;
        let mut dense = Dopri8Dense::new();
        let mut solver = OdeSolver::new(method);

        solver.solve_adaptive(
            &mut self.model,
            x0,
            tspan,
            &mut control,
            &mut self.events,
            &mut storage,
            Some(&mut dense),
        )?;

        Ok(dense)
    }

    /// Integrates with a constant step size.
    pub fn solve_fixed(
        &mut self,
        x0: &State,
        tspan: (f64, f64),
        dt: f64,
        method: SolverMethod,
        save_method: SaveMethod,
    ) -> Result<ResultStorage<State>, OdeError> {
        let capacity = ((tspan.1 - tspan.0) / dt).ceil() as usize + 1;
        let mut storage = ResultStorage::for_method(&save_method, capacity, x0)?;
        let mut solver = OdeSolver::new(method);

        solver.solve_fixed(
            &mut self.model,
            x0,
            tspan,
            dt,
            &mut self.events,
            &mut storage,
            None,
        )?;

        storage.finish()?;
        Ok(storage)
    }
}
