use crate::error::Error;
use nalgebra::Point2;
use rand::{Rng, distr::Distribution};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::{f64::consts::TAU, fmt};

/// Position and heading of an agent in a square toroidal world.
///
/// `x` and `y` lie in `[0, world_size)` and `heading` lies in `[0, 2 PI)`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawPose"))]
pub struct Pose {
    x: f64,
    y: f64,

    /// Heading in radians, counter-clockwise from +X.
    heading: f64,
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawPose {
    x: f64,
    y: f64,
    heading: f64,
}

/// Deserializing knows no world size, so only the lower bounds, finiteness
/// and the heading range are checked here.
#[cfg(feature = "serde")]
impl TryFrom<RawPose> for Pose {
    type Error = Error;

    fn try_from(raw: RawPose) -> Result<Self, Self::Error> {
        Self::try_new(raw.x, raw.y, raw.heading, f64::MAX)
    }
}

impl Pose {
    /// Creates a new `Pose` at an explicit location.
    ///
    /// Returns an error if any component lies outside its range. Values are
    /// never clamped; use [`Pose::wrap`] to fold arbitrary values into range.
    pub fn try_new(x: f64, y: f64, heading: f64, world_size: f64) -> Result<Self, Error> {
        check_world_size(world_size)?;
        Ok(Self {
            x: in_range("x", x, world_size)?,
            y: in_range("y", y, world_size)?,
            heading: in_range("heading", heading, TAU)?,
        })
    }

    /// Creates a new `Pose` wrapping `x` and `y` into `[0, world_size)` and
    /// `heading` into `[0, 2 PI)`.
    ///
    /// Wrapping a pose that is already in range returns it unchanged.
    /// Returns an error if any component is not finite.
    pub fn wrap(x: f64, y: f64, heading: f64, world_size: f64) -> Result<Self, Error> {
        check_world_size(world_size)?;
        Ok(Self {
            heading: wrap_into(finite("heading", heading)?, TAU),
            x: wrap_into(finite("x", x)?, world_size),
            y: wrap_into(finite("y", y)?, world_size),
        })
    }

    /// Creates a `Pose` from components known to be in range.
    pub(crate) const fn new_unchecked(x: f64, y: f64, heading: f64) -> Self {
        Self { x, y, heading }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn heading(&self) -> f64 {
        self.heading
    }

    pub fn position(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    /// Euclidean distance to `point`, ignoring the wrap-around.
    ///
    /// This is what a range sensor measures.
    pub fn distance_to(&self, point: &Point2<f64>) -> f64 {
        nalgebra::distance(&self.position(), point)
    }

    /// Squared distance to `other` along the shortest path on the torus.
    pub fn toroidal_distance_squared(&self, other: &Pose, world_size: f64) -> f64 {
        toroidal_delta(self.x, other.x, world_size).powi(2)
            + toroidal_delta(self.y, other.y, world_size).powi(2)
    }

    /// Checks that this pose lies inside a world of side `world_size`.
    pub(crate) fn validate(&self, world_size: f64) -> Result<(), Error> {
        Self::try_new(self.x, self.y, self.heading, world_size).map(|_| ())
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[x={:.3} y={:.3} orient={:.3}]",
            self.x, self.y, self.heading
        )
    }
}

/// Reduces `value` into `[0, modulus)`.
///
/// A non-finite `value` comes back as NaN.
pub(crate) fn wrap_into(value: f64, modulus: f64) -> f64 {
    let wrapped = value.rem_euclid(modulus);

    // A tiny negative value rounds up to exactly `modulus`.
    match wrapped == modulus {
        true => 0.0,
        false => wrapped,
    }
}

fn finite(quantity: &'static str, value: f64) -> Result<f64, Error> {
    match value.is_finite() {
        true => Ok(value),
        false => Err(Error::NonFinite { quantity, value }),
    }
}

fn toroidal_delta(a: f64, b: f64, world_size: f64) -> f64 {
    let delta = (a - b).abs();
    delta.min(world_size - delta)
}

fn in_range(quantity: &'static str, value: f64, bound: f64) -> Result<f64, Error> {
    match (0.0..bound).contains(&value) {
        true => Ok(value),
        false => Err(Error::OutOfRange {
            quantity,
            value,
            bound,
        }),
    }
}

pub(crate) fn check_world_size(world_size: f64) -> Result<f64, Error> {
    match world_size.is_finite() && world_size > 0.0 {
        true => Ok(world_size),
        false => Err(Error::invalid_parameter(
            "world size",
            world_size,
            "world size must be finite and positive",
        )),
    }
}

/// Samples poses uniformly over a world of side `world_size`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UniformPose {
    world_size: f64,
}

impl UniformPose {
    pub fn try_new(world_size: f64) -> Result<Self, Error> {
        Ok(Self {
            world_size: check_world_size(world_size)?,
        })
    }
}

impl Distribution<Pose> for UniformPose {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Pose {
        Pose {
            x: rng.random_range(0.0..self.world_size),
            y: rng.random_range(0.0..self.world_size),
            heading: rng.random_range(0.0..TAU),
        }
    }
}
