use crate::error::Error;
use rand::Rng;
use rand_distr::{Distribution, Normal};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Standard deviations of the noise an [`Agent`](crate::agent::Agent) adds to
/// its motion and its range readings.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawNoise"))]
pub struct Noise {
    /// Noise on the distance travelled by each move.
    forward: f64,

    /// Noise on the heading change of each move, in radians.
    turn: f64,

    /// Noise on every range reading.
    sense: f64,
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawNoise {
    forward: f64,
    turn: f64,
    sense: f64,
}

#[cfg(feature = "serde")]
impl TryFrom<RawNoise> for Noise {
    type Error = Error;

    fn try_from(raw: RawNoise) -> Result<Self, Self::Error> {
        Self::try_new(raw.forward, raw.turn, raw.sense)
    }
}

impl Noise {
    /// Creates a new `Noise` from three standard deviations.
    ///
    /// Returns an error if any of them is negative or not finite.
    pub fn try_new(forward: f64, turn: f64, sense: f64) -> Result<Self, Error> {
        Ok(Self {
            forward: std_dev("forward noise", forward)?,
            turn: std_dev("turn noise", turn)?,
            sense: std_dev("sense noise", sense)?,
        })
    }

    /// Creates a `Noise` from standard deviations known to be valid.
    pub(crate) const fn new_unchecked(forward: f64, turn: f64, sense: f64) -> Self {
        Self {
            forward,
            turn,
            sense,
        }
    }

    /// Creates a `Noise` that never perturbs anything.
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn forward(&self) -> f64 {
        self.forward
    }

    pub fn turn(&self) -> f64 {
        self.turn
    }

    pub fn sense(&self) -> f64 {
        self.sense
    }
}

fn std_dev(name: &'static str, value: f64) -> Result<f64, Error> {
    match value.is_finite() && value >= 0.0 {
        true => Ok(value),
        false => Err(Error::invalid_parameter(
            name,
            value,
            "standard deviation must be finite and non-negative",
        )),
    }
}

/// Draws a sample from a zero-mean Gaussian with standard deviation `sigma`.
///
/// A `sigma` of zero always yields zero but still consumes one draw from `rng`.
pub(crate) fn gaussian<R: Rng + ?Sized>(rng: &mut R, sigma: f64) -> Result<f64, Error> {
    let normal = Normal::new(0.0, sigma).map_err(|_| {
        Error::invalid_parameter(
            "standard deviation",
            sigma,
            "standard deviation must be finite and non-negative",
        )
    })?;
    Ok(normal.sample(rng))
}

/// Evaluates the density of a 1-D Gaussian with mean `mu` and standard
/// deviation `sigma` at `x`.
///
/// ```text
/// exp(-(mu - x)^2 / sigma^2 / 2) / sqrt(2 pi sigma^2)
/// ```
pub fn gaussian_density(mu: f64, sigma: f64, x: f64) -> Result<f64, Error> {
    let variance = density_variance(sigma)?;
    Ok((-(mu - x).powi(2) / variance / 2.0).exp() / (2.0 * PI * variance).sqrt())
}

/// Natural log of [`gaussian_density`].
pub fn gaussian_log_density(mu: f64, sigma: f64, x: f64) -> Result<f64, Error> {
    let variance = density_variance(sigma)?;
    Ok(-(mu - x).powi(2) / variance / 2.0 - 0.5 * (2.0 * PI * variance).ln())
}

fn density_variance(sigma: f64) -> Result<f64, Error> {
    match sigma.is_finite() && sigma > 0.0 {
        true => Ok(sigma.powi(2)),
        false => Err(Error::invalid_parameter(
            "sense noise",
            sigma,
            "a density needs a positive standard deviation",
        )),
    }
}
