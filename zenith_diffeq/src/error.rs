use thiserror::Error;

use crate::tableau::InvalidTableau;

/// Error type returned by user models. Boxed so model authors can surface
/// whatever failure they hit; `Send + Sync` so batch runs can cross thread
/// boundaries.
pub type ModelError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum OdeError {
    #[error(transparent)]
    InvalidTableau(#[from] InvalidTableau),
    #[error("state became non-finite at t = {t}")]
    NonFiniteState { t: f64 },
    #[error("step size {dt:e} fell below the minimum {min_dt:e} at t = {t}")]
    StepSizeTooSmall { t: f64, dt: f64, min_dt: f64 },
    #[error("exceeded {max_steps} steps at t = {t}")]
    MaxStepsExceeded { t: f64, max_steps: usize },
    #[error("dense output expected {expected} stage derivatives, got {found}")]
    DenseStageMismatch { expected: usize, found: usize },
    #[error("model evaluation failed at t = {t}: {source}")]
    Model { t: f64, source: ModelError },
    #[error("sampling failed: {0}")]
    Sampling(#[from] uncertainty::UncertaintyError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}
