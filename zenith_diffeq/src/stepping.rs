//! Step-size control for the adaptive solvers.
//!
//! Controllers consume the normalized error of the last attempt (at most 1
//! means the step passed) and propose the next step size. The stepper never
//! sees any of this; acceptance and retry live entirely out here.

use serde::{Deserialize, Serialize};

/// Step control strategy for a solve.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub enum StepMethod {
    Fixed(FixedStepControl),
    Adaptive(AdaptiveStepControl),
}

impl From<FixedStepControl> for StepMethod {
    fn from(value: FixedStepControl) -> Self {
        Self::Fixed(value)
    }
}

impl From<AdaptiveStepControl> for StepMethod {
    fn from(value: AdaptiveStepControl) -> Self {
        Self::Adaptive(value)
    }
}

/// Constant step size.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FixedStepControl {
    pub dt: f64,
}

impl FixedStepControl {
    pub fn new(dt: f64) -> Self {
        Self { dt }
    }
}

/// Adaptive step-size controller.
///
/// Holds the tolerances that define the error norm plus the step-size
/// policy (basic or PID) and its bounds.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct AdaptiveStepControl {
    method: AdaptiveStepMethod,
    /// Relative tolerance for the error norm.
    pub rel_tol: f64,
    /// Absolute tolerance for the error norm.
    pub abs_tol: f64,
    /// First step size; estimated from the initial derivative if unset.
    pub initial_dt: Option<f64>,
    /// Floor below which the solve fails instead of shrinking further.
    pub min_dt: Option<f64>,
    /// Cap on the step size.
    pub max_dt: Option<f64>,
    /// Attempted-step budget for one solve.
    pub max_steps: usize,
}

impl Default for AdaptiveStepControl {
    fn default() -> Self {
        Self {
            method: AdaptiveStepMethod::Basic(BasicStepControl::default()),
            rel_tol: 1e-3,
            abs_tol: 1e-6,
            initial_dt: None,
            min_dt: None,
            max_dt: None,
            max_steps: 100_000,
        }
    }
}

impl AdaptiveStepControl {
    /// Proposes the next step size from the normalized error of the last
    /// attempt. `order` is the error-control order of the method (embedded
    /// order plus one).
    pub fn next_step(&mut self, dt: f64, error: f64, order: usize) -> f64 {
        let mut new_dt = match &mut self.method {
            AdaptiveStepMethod::Basic(basic) => basic.step(dt, error, order),
            AdaptiveStepMethod::Pid(pid) => pid.step(dt, error),
        };
        if let Some(min_dt) = self.min_dt {
            new_dt = new_dt.max(min_dt);
        }
        if let Some(max_dt) = self.max_dt {
            new_dt = new_dt.min(max_dt);
        }
        new_dt
    }

    pub fn with_method(mut self, method: AdaptiveStepMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_rel_tol(mut self, rel_tol: f64) -> Self {
        self.rel_tol = rel_tol;
        self
    }

    pub fn with_abs_tol(mut self, abs_tol: f64) -> Self {
        self.abs_tol = abs_tol;
        self
    }

    pub fn with_initial_dt(mut self, initial_dt: f64) -> Self {
        self.initial_dt = Some(initial_dt);
        self
    }

    pub fn with_min_dt(mut self, min_dt: f64) -> Self {
        self.min_dt = Some(min_dt);
        self
    }

    pub fn with_max_dt(mut self, max_dt: f64) -> Self {
        self.max_dt = Some(max_dt);
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }
}

/// Step-size policy.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub enum AdaptiveStepMethod {
    Basic(BasicStepControl),
    Pid(StepPidControl),
}

/// I-controller: `safety * error^(-1/order)`, clamped per step.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct BasicStepControl {
    pub safety: f64,
    pub min_factor: f64,
    pub max_factor: f64,
}

impl Default for BasicStepControl {
    fn default() -> Self {
        Self { safety: 0.9, min_factor: 0.2, max_factor: 5.0 }
    }
}

impl BasicStepControl {
    pub fn step(&self, dt: f64, error: f64, order: usize) -> f64 {
        if error <= 0.0 {
            return dt * self.max_factor;
        }
        let factor = self.safety * error.powf(-1.0 / order as f64);
        dt * factor.clamp(self.min_factor, self.max_factor)
    }
}

/// PID controller over the recent error history.
///
/// Reacts to the trend of the error as well as its magnitude, which keeps
/// the step size from oscillating on problems where the basic controller
/// alternates between growth and rejection.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct StepPidControl {
    kp: f64,
    ki: f64,
    kd: f64,
    min_growth: Option<f64>,
    max_growth: Option<f64>,
    err_now: f64,
    err_prev: f64,
    err_prevprev: f64,
}

impl Default for StepPidControl {
    fn default() -> Self {
        Self {
            kp: 0.6,
            ki: 0.01,
            kd: 0.175,
            min_growth: Some(0.1),
            max_growth: Some(5.0),
            err_now: 1.0,
            err_prev: 1.0,
            err_prevprev: 1.0,
        }
    }
}

impl StepPidControl {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd, ..Self::default() }
    }

    pub fn with_growth_limits(mut self, min_growth: f64, max_growth: f64) -> Self {
        self.min_growth = Some(min_growth);
        self.max_growth = Some(max_growth);
        self
    }

    /// Next step size from the current normalized error and the history of
    /// the two before it.
    pub fn step(&mut self, dt: f64, error: f64) -> f64 {
        self.err_prevprev = self.err_prev;
        self.err_prev = self.err_now;
        self.err_now = error;

        const EPS: f64 = 1e-14;
        let e0 = self.err_now.max(EPS);
        let e1 = self.err_prev.max(EPS);
        let e2 = self.err_prevprev.max(EPS);

        let mut factor = e0.powf(-self.kp) * (e1 / e0).powf(self.kd) * (e2 / e1).powf(self.ki);

        if let Some(min_growth) = self.min_growth {
            factor = factor.max(min_growth);
        }
        if let Some(max_growth) = self.max_growth {
            factor = factor.min(max_growth);
        }

        dt * factor
    }
}
