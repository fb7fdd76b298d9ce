//! Integration methods and the accept/reject driver loop.
//!
//! A method is its coefficient data: the shared stage algorithm in
//! [`crate::rk`] consumes whichever tableau/dense-coefficient pair the
//! selected method supplies. The loop owns everything the stepper refuses
//! to do: error norms, acceptance, retry, step clamping, and stopping.

use serde::{Deserialize, Serialize};
use tolerance::Tolerance;

use crate::{
    OdeModel,
    dense::{DenseOutput, DenseSolution},
    dopri8,
    error::OdeError,
    events::EventManager,
    rk::RungeKutta,
    saving::ResultStorage,
    state::OdeState,
    stepping::AdaptiveStepControl,
    tableau::ButcherTableau,
};

/// Hard floor on the step size when no minimum is configured.
const DT_FLOOR: f64 = 1e-14;

/// The available integration methods.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub enum SolverMethod {
    /// Dormand-Prince 8(7) with dense output.
    #[default]
    Dopri8,
}

impl SolverMethod {
    pub fn tableau(&self) -> ButcherTableau {
        match self {
            Self::Dopri8 => ButcherTableau::dopri8(),
        }
    }

    /// Error-control order: the embedded order plus one.
    pub fn error_order(&self) -> usize {
        match self {
            Self::Dopri8 => dopri8::EMBEDDED_ORDER + 1,
        }
    }
}

/// Dense solution produced by the 8(7) method.
pub type Dopri8Dense<State> = DenseSolution<State, { dopri8::STAGES }, { dopri8::DENSE_DEGREE }>;

/// One method bound to one state type, with its stepper and error norm.
pub struct OdeSolver<State: OdeState> {
    method: SolverMethod,
    rk: RungeKutta<State>,
    tolerances: State::Tolerance,
}

impl<State: OdeState> OdeSolver<State> {
    pub fn new(method: SolverMethod) -> Self {
        Self {
            method,
            rk: RungeKutta::new(method.tableau()),
            tolerances: State::Tolerance::default(),
        }
    }

    pub fn with_tolerances(mut self, tolerances: State::Tolerance) -> Self {
        self.tolerances = tolerances;
        self
    }

    /// Adaptive integration over `tspan`.
    ///
    /// Saves `x0` and every accepted step into `storage`; appends each
    /// step's interpolant to `dense` when one is requested. Returns early
    /// (cleanly) when a terminal continuous event fires.
    pub fn solve_adaptive<Model>(
        &mut self,
        model: &mut Model,
        x0: &State,
        tspan: (f64, f64),
        control: &mut AdaptiveStepControl,
        events: &mut EventManager<Model, State>,
        storage: &mut ResultStorage<State>,
        mut dense: Option<&mut Dopri8Dense<State>>,
    ) -> Result<(), OdeError>
    where
        Model: OdeModel<State = State>,
    {
        let (t_start, t_end) = tspan;
        let mut t = t_start;
        let mut y = x0.clone();
        let mut y1 = x0.clone();

        events.initialize(t_start);
        storage.save(t, &y)?;

        let mut h = match control.initial_dt {
            Some(h0) => h0,
            None => self.initial_step(model, t, &y, control)?,
        };
        if let Some(max_dt) = control.max_dt {
            h = h.min(max_dt);
        }

        let min_dt = control.min_dt.unwrap_or(DT_FLOOR);
        let mut steps = 0usize;

        while t < t_end {
            steps += 1;
            if steps > control.max_steps {
                return Err(OdeError::MaxStepsExceeded { t, max_steps: control.max_steps });
            }

            // land exactly on the span end and on scheduled event times
            h = h.min(t_end - t);
            let event_time = events.next_time();
            if event_time > t && event_time.is_finite() {
                h = h.min(event_time - t);
            }

            self.rk.step(model, t, &y, h, &mut y1)?;
            let error = self.tolerances.compute_error(
                &y,
                &y1,
                self.rk.error_estimate(),
                control.rel_tol,
                control.abs_tol,
            );

            if error.is_finite() && error <= 1.0 {
                let t1 = t + h;
                let wants_dense = dense.is_some() || !events.continuous_events.is_empty();
                let interpolant = if wants_dense {
                    Some(DenseOutput::new(
                        t,
                        t1,
                        y.clone(),
                        self.rk.stage_derivatives().to_vec(),
                        &dopri8::DOPRI8_DENSE,
                    )?)
                } else {
                    None
                };

                if let Some(interpolant) = &interpolant {
                    if let Some(t_stop) =
                        events.handle_continuous(model, interpolant, (t, t1), &y, &y1)
                    {
                        let y_stop = interpolant.evaluate(t_stop);
                        storage.save(t_stop, &y_stop)?;
                        if let Some(dense) = dense.as_mut() {
                            dense.push(interpolant.clone());
                        }
                        return Ok(());
                    }
                }

                events.handle_periodic(model, t1, &mut y1);

                storage.save(t1, &y1)?;
                if let Some(dense) = dense.as_mut() {
                    if let Some(interpolant) = interpolant {
                        dense.push(interpolant);
                    }
                }

                t = t1;
                y.clone_from(&y1);
                h = control.next_step(h, error, self.method.error_order());
            } else {
                // rejected; a step already at the floor has nowhere left
                // to go
                if h <= min_dt {
                    return if error.is_finite() {
                        Err(OdeError::StepSizeTooSmall { t, dt: h, min_dt })
                    } else {
                        Err(OdeError::NonFiniteState { t })
                    };
                }
                h = if error.is_finite() {
                    control.next_step(h, error, self.method.error_order())
                } else {
                    // a non-finite error norm means the state blew up
                    // somewhere in the step; retry much smaller
                    (h * 0.1).max(min_dt)
                };
            }
        }

        Ok(())
    }

    /// Fixed-step integration over `tspan`.
    pub fn solve_fixed<Model>(
        &mut self,
        model: &mut Model,
        x0: &State,
        tspan: (f64, f64),
        dt: f64,
        events: &mut EventManager<Model, State>,
        storage: &mut ResultStorage<State>,
        mut dense: Option<&mut Dopri8Dense<State>>,
    ) -> Result<(), OdeError>
    where
        Model: OdeModel<State = State>,
    {
        let (t_start, t_end) = tspan;
        let mut t = t_start;
        let mut y = x0.clone();
        let mut y1 = x0.clone();

        events.initialize(t_start);
        storage.save(t, &y)?;

        while t < t_end {
            let mut h = dt.min(t_end - t);
            let event_time = events.next_time();
            if event_time > t && event_time.is_finite() {
                h = h.min(event_time - t);
            }

            self.rk.step(model, t, &y, h, &mut y1)?;
            let t1 = t + h;

            let wants_dense = dense.is_some() || !events.continuous_events.is_empty();
            let interpolant = if wants_dense {
                Some(DenseOutput::new(
                    t,
                    t1,
                    y.clone(),
                    self.rk.stage_derivatives().to_vec(),
                    &dopri8::DOPRI8_DENSE,
                )?)
            } else {
                None
            };

            if let Some(interpolant) = &interpolant {
                if let Some(t_stop) =
                    events.handle_continuous(model, interpolant, (t, t1), &y, &y1)
                {
                    let y_stop = interpolant.evaluate(t_stop);
                    storage.save(t_stop, &y_stop)?;
                    if let Some(dense) = dense.as_mut() {
                        dense.push(interpolant.clone());
                    }
                    return Ok(());
                }
            }

            events.handle_periodic(model, t1, &mut y1);

            storage.save(t1, &y1)?;
            if let Some(dense) = dense.as_mut() {
                if let Some(interpolant) = interpolant {
                    dense.push(interpolant);
                }
            }

            t = t1;
            y.clone_from(&y1);
        }

        Ok(())
    }

    /// First-step estimate from the scaled norms of the initial state and
    /// its derivative, so the very first attempt is neither wasteful nor a
    /// guaranteed rejection.
    fn initial_step<Model>(
        &mut self,
        model: &mut Model,
        t: f64,
        y0: &State,
        control: &AdaptiveStepControl,
    ) -> Result<f64, OdeError>
    where
        Model: OdeModel<State = State>,
    {
        let mut f0 = y0.clone();
        model
            .f(t, y0, &mut f0)
            .map_err(|source| OdeError::Model { t, source })?;

        let d0 = self
            .tolerances
            .compute_error(y0, y0, y0, control.rel_tol, control.abs_tol);
        let d1 = self
            .tolerances
            .compute_error(y0, y0, &f0, control.rel_tol, control.abs_tol);

        if d0 < 1e-5 || d1 < 1e-5 || !d0.is_finite() || !d1.is_finite() {
            Ok(1e-6)
        } else {
            Ok(0.01 * d0 / d1)
        }
    }
}
