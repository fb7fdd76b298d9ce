use std::ops::{AddAssign, Deref, DerefMut, MulAssign};

use tolerance::{Tolerance, Tolerances, compute_error};

use crate::{error::OdeError, saving::StateWriter, state::OdeState};

/// A fixed-size state of `N` components.
#[derive(Clone, Copy, Debug)]
pub struct StateArray<const N: usize>([f64; N]);

impl<const N: usize> StateArray<N> {
    pub fn new(array: [f64; N]) -> Self {
        Self(array)
    }
}

impl<const N: usize> Default for StateArray<N> {
    fn default() -> Self {
        Self([0.0; N])
    }
}

impl<const N: usize> From<[f64; N]> for StateArray<N> {
    fn from(array: [f64; N]) -> Self {
        Self(array)
    }
}

impl<const N: usize> AddAssign<&Self> for StateArray<N> {
    fn add_assign(&mut self, rhs: &Self) {
        for i in 0..N {
            self.0[i] += rhs.0[i];
        }
    }
}

impl<const N: usize> MulAssign<f64> for StateArray<N> {
    fn mul_assign(&mut self, rhs: f64) {
        for i in 0..N {
            self.0[i] *= rhs;
        }
    }
}

impl<const N: usize> Deref for StateArray<N> {
    type Target = [f64; N];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<const N: usize> DerefMut for StateArray<N> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<const N: usize> OdeState for StateArray<N> {
    type Tolerance = StateArrayTolerances<N>;

    fn headers(&self) -> Vec<String> {
        let mut headers = Vec::with_capacity(N + 1);
        headers.push("t".to_string());
        for i in 0..N {
            headers.push(format!("x{i}"));
        }
        headers
    }

    fn write_record(&self, t: f64, writer: &mut StateWriter) -> Result<(), OdeError> {
        writer.write_row(t, &self.0)
    }
}

/// Optional per-component tolerance overrides for a `StateArray`.
///
/// Components without an entry fall back to the controller's global
/// relative and absolute tolerances.
pub struct StateArrayTolerances<const N: usize>([Option<Tolerances>; N]);

impl<const N: usize> StateArrayTolerances<N> {
    pub fn new(tolerances: [Option<Tolerances>; N]) -> Self {
        Self(tolerances)
    }
}

impl<const N: usize> Default for StateArrayTolerances<N> {
    fn default() -> Self {
        Self([None; N])
    }
}

impl<const N: usize> Tolerance for StateArrayTolerances<N> {
    type State = StateArray<N>;

    fn compute_error(
        &self,
        y0: &StateArray<N>,
        y1: &StateArray<N>,
        err: &StateArray<N>,
        rel_tol: f64,
        abs_tol: f64,
    ) -> f64 {
        if N == 0 {
            return 0.0;
        }

        let mut sum_squared = 0.0;
        for (i, tol) in self.0.iter().enumerate() {
            let component = match tol {
                Some(tol) => tol.compute_error(y0.0[i], y1.0[i], err.0[i]),
                None => compute_error(y0.0[i], y1.0[i], err.0[i], rel_tol, abs_tol),
            };
            sum_squared += component * component;
        }

        (sum_squared / N as f64).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_is_elementwise() {
        let mut a = StateArray::new([1.0, 2.0]);
        let b = StateArray::new([0.5, -1.0]);
        a += &b;
        a *= 2.0;
        assert_eq!(*a, [3.0, 2.0]);
    }

    #[test]
    fn error_norm_is_rms_of_scaled_components() {
        let tols = StateArrayTolerances::<2>::default();
        let y = StateArray::new([0.0, 0.0]);
        let err = StateArray::new([2e-6, 2e-6]);
        // each component scales to 2 against abs_tol 1e-6
        let norm = tols.compute_error(&y, &y, &err, 1e-3, 1e-6);
        assert!((norm - 2.0).abs() < 1e-12);
    }

    #[test]
    fn per_component_overrides_take_precedence() {
        let tols =
            StateArrayTolerances::new([Some(Tolerances::new(1e-3, 1.0)), None]);
        let y = StateArray::new([0.0, 0.0]);
        let err = StateArray::new([1.0, 0.0]);
        // first component is scaled by its own abs_tol of 1.0
        let norm = tols.compute_error(&y, &y, &err, 1e-3, 1e-12);
        assert!((norm - (0.5f64).sqrt()).abs() < 1e-12);
    }
}
