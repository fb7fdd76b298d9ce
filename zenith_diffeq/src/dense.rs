//! Dense output: continuous solutions inside accepted steps.
//!
//! Each accepted step yields an interpolant built from that step's stage
//! derivatives. Per stage, a fixed polynomial in the normalized time
//! `tau = (t - t0) / (t1 - t0)` weights the stage's contribution; every
//! polynomial carries a leading factor of `tau`, so at `tau = 0` the
//! interpolant hands back `y0` untouched, and consecutive steps chain into a
//! continuous trajectory. The derivative matrix is derived from the value
//! matrix algebraically, so the two can never disagree.

use crate::{error::OdeError, state::OdeState};

/// Per-stage polynomial coefficients of one method's dense-output scheme,
/// in descending powers of the normalized time.
///
/// Like the tableau, these are constructed once per method and shared
/// read-only by every integration.
#[derive(Debug)]
pub struct DenseCoefficients<const S: usize, const D: usize> {
    pub eval: [[f64; D]; S],
    pub diff: [[f64; D]; S],
}

/// Continuous solution over a single step from `t0` to `t1`.
///
/// Evaluation outside the interval extrapolates the same polynomial rather
/// than failing; how far to trust the extrapolation is the caller's call.
#[derive(Clone, Debug)]
pub struct DenseOutput<State, const S: usize, const D: usize>
where
    State: OdeState,
{
    t0: f64,
    t1: f64,
    y0: State,
    stage_derivatives: Vec<State>,
    coefficients: &'static DenseCoefficients<S, D>,
}

impl<State, const S: usize, const D: usize> DenseOutput<State, S, D>
where
    State: OdeState,
{
    pub fn new(
        t0: f64,
        t1: f64,
        y0: State,
        stage_derivatives: Vec<State>,
        coefficients: &'static DenseCoefficients<S, D>,
    ) -> Result<Self, OdeError> {
        if stage_derivatives.len() != S {
            return Err(OdeError::DenseStageMismatch {
                expected: S,
                found: stage_derivatives.len(),
            });
        }
        Ok(Self { t0, t1, y0, stage_derivatives, coefficients })
    }

    pub fn t0(&self) -> f64 {
        self.t0
    }

    pub fn t1(&self) -> f64 {
        self.t1
    }

    pub fn y0(&self) -> &State {
        &self.y0
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.t0 && t <= self.t1
    }

    fn tau(&self, t: f64) -> f64 {
        (t - self.t0) / (self.t1 - self.t0)
    }

    /// State at `t`.
    pub fn evaluate(&self, t: f64) -> State {
        let tau = self.tau(t);
        let h = self.t1 - self.t0;
        let mut y = self.y0.clone();
        let mut scaled = self.y0.clone();
        for (i, row) in self.coefficients.eval.iter().enumerate() {
            if is_zero_row(row) {
                continue;
            }
            let weight = polyval(row, tau) * tau * h;
            if weight == 0.0 {
                continue;
            }
            scaled.clone_from(&self.stage_derivatives[i]);
            scaled *= weight;
            y += &scaled;
        }
        y
    }

    /// The increment `evaluate(tb) - evaluate(ta)`, formed without building
    /// either endpoint value so nearby times don't cancel through `y0`.
    pub fn evaluate_between(&self, ta: f64, tb: f64) -> State {
        let tau_a = self.tau(ta);
        let tau_b = self.tau(tb);
        let h = self.t1 - self.t0;
        let mut delta = self.y0.clone();
        delta *= 0.0;
        let mut scaled = self.y0.clone();
        for (i, row) in self.coefficients.eval.iter().enumerate() {
            if is_zero_row(row) {
                continue;
            }
            let weight = (polyval(row, tau_b) * tau_b - polyval(row, tau_a) * tau_a) * h;
            if weight == 0.0 {
                continue;
            }
            scaled.clone_from(&self.stage_derivatives[i]);
            scaled *= weight;
            delta += &scaled;
        }
        delta
    }

    /// Time derivative of the interpolated solution at `t`.
    ///
    /// The per-stage polynomials are differentiated in normalized time, so
    /// the chain-rule factor cancels the step length and the stage
    /// derivatives enter unscaled.
    pub fn derivative(&self, t: f64) -> State {
        let tau = self.tau(t);
        let mut dy = self.y0.clone();
        dy *= 0.0;
        let mut scaled = self.y0.clone();
        for (i, row) in self.coefficients.diff.iter().enumerate() {
            if is_zero_row(row) {
                continue;
            }
            let weight = polyval(row, tau);
            if weight == 0.0 {
                continue;
            }
            scaled.clone_from(&self.stage_derivatives[i]);
            scaled *= weight;
            dy += &scaled;
        }
        dy
    }
}

/// Piecewise dense solution assembled from consecutive accepted steps.
#[derive(Clone, Debug)]
pub struct DenseSolution<State, const S: usize, const D: usize>
where
    State: OdeState,
{
    segments: Vec<DenseOutput<State, S, D>>,
}

impl<State, const S: usize, const D: usize> DenseSolution<State, S, D>
where
    State: OdeState,
{
    pub fn new() -> Self {
        Self { segments: Vec::new() }
    }

    pub fn push(&mut self, segment: DenseOutput<State, S, D>) {
        self.segments.push(segment);
    }

    pub fn segments(&self) -> &[DenseOutput<State, S, D>] {
        &self.segments
    }

    /// Start and end times covered by the solution.
    pub fn span(&self) -> Option<(f64, f64)> {
        let first = self.segments.first()?;
        let last = self.segments.last()?;
        Some((first.t0(), last.t1()))
    }

    /// State at `t`, or `None` outside the covered span.
    pub fn evaluate(&self, t: f64) -> Option<State> {
        let (start, end) = self.span()?;
        if t < start || t > end {
            return None;
        }
        let index = self
            .segments
            .partition_point(|segment| segment.t1() < t)
            .min(self.segments.len() - 1);
        Some(self.segments[index].evaluate(t))
    }

    /// States at each query time, `None` where a time is outside the span.
    pub fn evaluate_many(&self, ts: &[f64]) -> Vec<Option<State>> {
        ts.iter().map(|&t| self.evaluate(t)).collect()
    }

    /// Uniformly spaced samples over the covered span, inclusive of both
    /// ends.
    pub fn sample_uniform(&self, dt: f64) -> (Vec<f64>, Vec<State>) {
        let Some((start, end)) = self.span() else {
            return (Vec::new(), Vec::new());
        };
        let n = ((end - start) / dt).floor() as usize;
        let mut ts = Vec::with_capacity(n + 2);
        let mut ys = Vec::with_capacity(n + 2);
        for i in 0..=n {
            let t = start + i as f64 * dt;
            if let Some(y) = self.evaluate(t) {
                ts.push(t);
                ys.push(y);
            }
        }
        if ts.last().is_none_or(|&t| t < end) {
            if let Some(y) = self.evaluate(end) {
                ts.push(end);
                ys.push(y);
            }
        }
        (ts, ys)
    }
}

impl<State, const S: usize, const D: usize> Default for DenseSolution<State, S, D>
where
    State: OdeState,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Horner evaluation of a polynomial given in descending powers.
fn polyval(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().fold(0.0, |acc, &c| acc * x + c)
}

fn is_zero_row(row: &[f64]) -> bool {
    row.iter().all(|&c| c == 0.0)
}
