//! State types the solvers can integrate.
//!
//! A state only needs to be a vector space: element-wise addition and
//! scaling by a step-size-weighted coefficient are the whole algebra the
//! stage loop performs. The associated tolerance type defines how the
//! adaptive controller turns an error-estimate state into a single norm.

use std::{
    fmt::Debug,
    ops::{AddAssign, MulAssign},
};

use tolerance::Tolerance;

use crate::{error::OdeError, saving::StateWriter};

pub mod state_array;
pub mod state_vector;

pub use state_array::{StateArray, StateArrayTolerances};
pub use state_vector::{StateVector, StateVectorTolerances};

pub trait OdeState:
    Clone + Debug + Default + MulAssign<f64> + Send + Sync + 'static
where
    for<'a> Self: AddAssign<&'a Self>,
{
    /// Error-norm model used by adaptive step control.
    type Tolerance: Tolerance<State = Self>;

    /// Column headers for file output, including the time column.
    fn headers(&self) -> Vec<String> {
        Vec::new()
    }

    /// Write one `(t, state)` record to file output.
    fn write_record(&self, _t: f64, _writer: &mut StateWriter) -> Result<(), OdeError> {
        panic!(
            "file output is not implemented for this state type; implement `headers` and `write_record` to enable it"
        );
    }
}
