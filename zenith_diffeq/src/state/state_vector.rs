use std::ops::{AddAssign, Deref, DerefMut, MulAssign};

use tolerance::{Tolerance, Tolerances, compute_error};

use crate::{error::OdeError, saving::StateWriter, state::OdeState};

/// A heap-allocated state whose dimension is chosen at runtime.
#[derive(Clone, Debug, Default)]
pub struct StateVector(Vec<f64>);

impl StateVector {
    pub fn new(value: Vec<f64>) -> Self {
        Self(value)
    }

    pub fn zeros(n: usize) -> Self {
        Self(vec![0.0; n])
    }
}

impl From<Vec<f64>> for StateVector {
    fn from(value: Vec<f64>) -> Self {
        Self(value)
    }
}

impl AddAssign<&Self> for StateVector {
    /// # Panics
    ///
    /// Panics if the vectors have different lengths.
    fn add_assign(&mut self, rhs: &Self) {
        if self.0.len() != rhs.0.len() {
            panic!("state vectors do not have the same length");
        }
        for (a, b) in self.0.iter_mut().zip(&rhs.0) {
            *a += b;
        }
    }
}

impl MulAssign<f64> for StateVector {
    fn mul_assign(&mut self, rhs: f64) {
        for a in &mut self.0 {
            *a *= rhs;
        }
    }
}

impl Deref for StateVector {
    type Target = Vec<f64>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for StateVector {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl OdeState for StateVector {
    type Tolerance = StateVectorTolerances;

    fn headers(&self) -> Vec<String> {
        let mut headers = Vec::with_capacity(self.0.len() + 1);
        headers.push("t".to_string());
        for i in 0..self.0.len() {
            headers.push(format!("x{i}"));
        }
        headers
    }

    fn write_record(&self, t: f64, writer: &mut StateWriter) -> Result<(), OdeError> {
        writer.write_row(t, &self.0)
    }
}

/// Optional per-component tolerance overrides for a `StateVector`.
///
/// Components beyond the configured entries, or entries set to `None`, fall
/// back to the controller's global tolerances.
#[derive(Default)]
pub struct StateVectorTolerances(pub Vec<Option<Tolerances>>);

impl Tolerance for StateVectorTolerances {
    type State = StateVector;

    fn compute_error(
        &self,
        y0: &StateVector,
        y1: &StateVector,
        err: &StateVector,
        rel_tol: f64,
        abs_tol: f64,
    ) -> f64 {
        let n = err.0.len();
        if n == 0 {
            return 0.0;
        }

        let mut sum_squared = 0.0;
        for i in 0..n {
            let component = match self.0.get(i) {
                Some(Some(tol)) => tol.compute_error(y0.0[i], y1.0[i], err.0[i]),
                _ => compute_error(y0.0[i], y1.0[i], err.0[i], rel_tol, abs_tol),
            };
            sum_squared += component * component;
        }

        (sum_squared / n as f64).sqrt()
    }
}
