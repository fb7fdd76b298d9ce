//! The explicit Runge-Kutta stage algorithm.
//!
//! One `step` call walks the tableau's lower triangle: each stage derivative
//! is the vector field at a state assembled from the stages before it, so
//! evaluation is strictly left to right with no cyclic dependencies. The
//! stage derivatives stay available after the step because the dense-output
//! interpolant is built from them.

use crate::{
    OdeModel,
    error::OdeError,
    state::OdeState,
    tableau::ButcherTableau,
};

/// Stepper for one explicit embedded method.
///
/// Owns its stage-derivative and scratch buffers so repeated stepping does
/// not allocate. Performs no step-acceptance logic; the error estimate is
/// handed to whatever controller drives the stepper.
pub struct RungeKutta<State: OdeState> {
    tableau: ButcherTableau,
    stage_derivatives: Vec<State>,
    error_estimate: State,
    y_stage: State,
    scaled: State,
}

impl<State: OdeState> RungeKutta<State> {
    pub fn new(tableau: ButcherTableau) -> Self {
        let stages = tableau.stages();
        Self {
            tableau,
            stage_derivatives: vec![State::default(); stages],
            error_estimate: State::default(),
            y_stage: State::default(),
            scaled: State::default(),
        }
    }

    pub fn tableau(&self) -> &ButcherTableau {
        &self.tableau
    }

    /// Advance `(t, y0)` by `h`, writing the higher-order solution into
    /// `y1`. The stage derivatives and the error estimate for this step are
    /// available from the accessors afterwards.
    ///
    /// Model failures propagate unchanged; no retry happens here.
    pub fn step<Model>(
        &mut self,
        model: &mut Model,
        t: f64,
        y0: &State,
        h: f64,
        y1: &mut State,
    ) -> Result<(), OdeError>
    where
        Model: OdeModel<State = State>,
    {
        let stages = self.tableau.stages();

        // derivative buffers are shaped like the state before the model
        // sees them, so runtime-sized states never meet an empty buffer
        self.stage_derivatives[0].clone_from(y0);
        model
            .f(t, y0, &mut self.stage_derivatives[0])
            .map_err(|source| OdeError::Model { t, source })?;

        for s in 1..stages {
            self.y_stage.clone_from(y0);
            let row = self.tableau.stage_row(s);
            for (j, &a) in row.iter().enumerate() {
                if a == 0.0 {
                    continue;
                }
                self.scaled.clone_from(&self.stage_derivatives[j]);
                self.scaled *= a * h;
                self.y_stage += &self.scaled;
            }

            let t_stage = t + self.tableau.time_fraction(s) * h;
            self.stage_derivatives[s].clone_from(&self.y_stage);
            model
                .f(t_stage, &self.y_stage, &mut self.stage_derivatives[s])
                .map_err(|source| OdeError::Model { t: t_stage, source })?;
        }

        y1.clone_from(y0);
        for (s, &b) in self.tableau.solution_weights().iter().enumerate() {
            if b == 0.0 {
                continue;
            }
            self.scaled.clone_from(&self.stage_derivatives[s]);
            self.scaled *= b * h;
            *y1 += &self.scaled;
        }

        self.error_estimate.clone_from(y0);
        self.error_estimate *= 0.0;
        for (s, &e) in self.tableau.error_weights().iter().enumerate() {
            if e == 0.0 {
                continue;
            }
            self.scaled.clone_from(&self.stage_derivatives[s]);
            self.scaled *= e * h;
            self.error_estimate += &self.scaled;
        }

        Ok(())
    }

    /// Stage derivatives from the most recent step, one per stage, each the
    /// vector field at that stage's time and state.
    pub fn stage_derivatives(&self) -> &[State] {
        &self.stage_derivatives
    }

    /// `h * sum(error_weights[i] * stage_derivatives[i])` from the most
    /// recent step: the difference between the advancing and embedded
    /// solutions, same shape as the state.
    pub fn error_estimate(&self) -> &State {
        &self.error_estimate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ModelError, state::StateArray};
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[derive(Debug)]
    struct Decay;

    impl OdeModel for Decay {
        type State = StateArray<1>;

        fn f(
            &mut self,
            _t: f64,
            y: &Self::State,
            dydt: &mut Self::State,
        ) -> Result<(), ModelError> {
            dydt[0] = -y[0];
            Ok(())
        }
    }

    #[derive(Debug)]
    struct OcticRamp;

    impl OdeModel for OcticRamp {
        type State = StateArray<1>;

        fn f(
            &mut self,
            t: f64,
            _y: &Self::State,
            dydt: &mut Self::State,
        ) -> Result<(), ModelError> {
            dydt[0] = 8.0 * t.powi(7);
            Ok(())
        }
    }

    #[derive(Debug)]
    struct Failing;

    impl OdeModel for Failing {
        type State = StateArray<1>;

        fn f(
            &mut self,
            _t: f64,
            _y: &Self::State,
            _dydt: &mut Self::State,
        ) -> Result<(), ModelError> {
            Err("vector field blew up".into())
        }
    }

    #[test]
    fn one_step_of_exponential_decay() {
        let mut solver = RungeKutta::new(ButcherTableau::dopri8());
        let mut model = Decay;
        let y0 = StateArray::new([1.0]);
        let mut y1 = StateArray::default();

        solver.step(&mut model, 0.0, &y0, 0.1, &mut y1).unwrap();

        assert_relative_eq!(y1[0], (-0.1f64).exp(), max_relative = 1e-11);
        let err = solver.error_estimate()[0].abs();
        assert!(err > 0.0 && err < 1e-9, "error estimate was {err:e}");
    }

    #[test]
    fn integrates_a_degree_eight_solution_exactly() {
        // y(t) = t^8 is inside the method's order, so a single step of any
        // size reproduces it to roundoff
        let mut solver = RungeKutta::new(ButcherTableau::dopri8());
        let mut model = OcticRamp;
        let t0: f64 = 0.3;
        let h = 0.7;
        let y0 = StateArray::new([t0.powi(8)]);
        let mut y1 = StateArray::default();

        solver.step(&mut model, t0, &y0, h, &mut y1).unwrap();

        assert_relative_eq!(y1[0], (t0 + h).powi(8), max_relative = 1e-12);
    }

    #[test]
    fn exposes_all_stage_derivatives() {
        let mut solver = RungeKutta::new(ButcherTableau::dopri8());
        let mut model = Decay;
        let y0 = StateArray::new([2.0]);
        let mut y1 = StateArray::default();

        solver.step(&mut model, 0.0, &y0, 0.05, &mut y1).unwrap();

        let k = solver.stage_derivatives();
        assert_eq!(k.len(), 14);
        // first stage is the field at the step start
        assert_eq!(k[0][0], -2.0);
        // last stage is the field at the accepted endpoint
        assert_abs_diff_eq!(k[13][0], -y1[0], epsilon = 1e-15);
    }

    #[test]
    fn model_failures_surface_unchanged() {
        let mut solver = RungeKutta::new(ButcherTableau::dopri8());
        let mut model = Failing;
        let y0 = StateArray::new([1.0]);
        let mut y1 = StateArray::default();

        let err = solver.step(&mut model, 0.0, &y0, 0.1, &mut y1).unwrap_err();
        assert!(matches!(err, OdeError::Model { .. }));
    }
}
