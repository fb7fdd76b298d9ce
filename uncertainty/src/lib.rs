//! Sampled-parameter builders for dispersion analysis.
//!
//! A builder describes the uncertainty on a value (or a whole model) and
//! produces concrete samples from a caller-supplied rng, so a batch of runs
//! can be reproduced from a single seed.

use rand::Rng;
use rand::distr::{Distribution, Uniform, uniform::Error as UniformError};
use rand_distr::{Normal, NormalError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UncertaintyError {
    #[error(transparent)]
    Normal(#[from] NormalError),
    #[error(transparent)]
    Uniform(#[from] UniformError),
}

/// A source of sampled values.
///
/// `nominal` requests the undispersed value (the mean, midpoint, or fixed
/// value), which batch drivers use for reference runs.
pub trait Uncertainty {
    type Output;

    fn sample<R: Rng>(&self, nominal: bool, rng: &mut R) -> Result<Self::Output, UncertaintyError>;
}

/// A scalar with an attached distribution.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub enum UncertainValue {
    Fixed(f64),
    Normal { mean: f64, std_dev: f64 },
    Uniform { lower: f64, upper: f64 },
}

impl UncertainValue {
    pub fn new_fixed(value: f64) -> Self {
        Self::Fixed(value)
    }

    pub fn new_normal(mean: f64, std_dev: f64) -> Self {
        Self::Normal { mean, std_dev }
    }

    pub fn new_uniform(lower: f64, upper: f64) -> Self {
        Self::Uniform { lower, upper }
    }

    /// The undispersed value.
    pub fn nominal(&self) -> f64 {
        match *self {
            Self::Fixed(value) => value,
            Self::Normal { mean, .. } => mean,
            Self::Uniform { lower, upper } => 0.5 * (lower + upper),
        }
    }
}

impl Uncertainty for UncertainValue {
    type Output = f64;

    fn sample<R: Rng>(&self, nominal: bool, rng: &mut R) -> Result<f64, UncertaintyError> {
        if nominal {
            return Ok(self.nominal());
        }
        match *self {
            Self::Fixed(value) => Ok(value),
            Self::Normal { mean, std_dev } => Ok(Normal::new(mean, std_dev)?.sample(rng)),
            Self::Uniform { lower, upper } => Ok(Uniform::new(lower, upper)?.sample(rng)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::SmallRng};

    #[test]
    fn fixed_values_ignore_the_rng() {
        let mut rng = SmallRng::seed_from_u64(7);
        let value = UncertainValue::new_fixed(3.25);
        assert_eq!(value.sample(false, &mut rng).unwrap(), 3.25);
        assert_eq!(value.sample(true, &mut rng).unwrap(), 3.25);
    }

    #[test]
    fn nominal_skips_dispersion() {
        let mut rng = SmallRng::seed_from_u64(7);
        let value = UncertainValue::new_normal(10.0, 2.0);
        assert_eq!(value.sample(true, &mut rng).unwrap(), 10.0);
        assert_eq!(UncertainValue::new_uniform(2.0, 4.0).nominal(), 3.0);
    }

    #[test]
    fn sampling_is_reproducible_from_the_seed() {
        let value = UncertainValue::new_normal(0.0, 1.0);
        let mut a = SmallRng::seed_from_u64(42);
        let mut b = SmallRng::seed_from_u64(42);
        let xa = value.sample(false, &mut a).unwrap();
        let xb = value.sample(false, &mut b).unwrap();
        assert_eq!(xa, xb);
    }

    #[test]
    fn uniform_samples_stay_in_range() {
        let value = UncertainValue::new_uniform(-1.0, 1.0);
        let mut rng = SmallRng::seed_from_u64(0);
        for _ in 0..100 {
            let x = value.sample(false, &mut rng).unwrap();
            assert!((-1.0..1.0).contains(&x));
        }
    }

    #[test]
    fn invalid_normal_reports_an_error() {
        let mut rng = SmallRng::seed_from_u64(0);
        let value = UncertainValue::new_normal(0.0, -1.0);
        assert!(value.sample(false, &mut rng).is_err());
    }
}
