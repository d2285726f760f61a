//! Crate-wide error type.

use thiserror::Error;

use crate::body::BodyHandle;

/// Errors raised by the simulation kernel.
///
/// Every variant is a caller precondition violation; none of them are retried internally.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum Error {
    /// A time delta passed to a stepping, integrating or interrupt operation was negative (or NaN).
    #[error("time delta must be non-negative, got {0}")]
    NegativeTimeDelta(f32),
    /// Body mass must be strictly positive.
    #[error("body mass must be strictly positive, got {0}")]
    NonPositiveMass(f32),
    /// Body angular inertia must be strictly positive.
    #[error("body angular inertia must be strictly positive, got {0}")]
    NonPositiveInertia(f32),
    /// A handle that no longer (or never did) refer to a body in this set.
    #[error("no body for handle {0:?}")]
    UnknownBody(BodyHandle),
    /// Rejected simulation configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Rejects negative and NaN time deltas.
#[inline]
pub(crate) fn check_time_delta(dt: f32) -> Result<f32> {
    if dt >= 0.0 {
        Ok(dt)
    } else {
        Err(Error::NegativeTimeDelta(dt))
    }
}
