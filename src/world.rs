use crate::{error::Error, pose::check_world_size};
use nalgebra::Point2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A square toroidal world of side `size` with landmarks at fixed, known
/// locations.
///
/// The landmark order is the order of every range reading taken in this world.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawWorld"))]
pub struct World {
    size: f64,
    landmarks: Vec<Point2<f64>>,
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawWorld {
    size: f64,
    landmarks: Vec<Point2<f64>>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawWorld> for World {
    type Error = Error;

    fn try_from(raw: RawWorld) -> Result<Self, Self::Error> {
        Self::try_new(raw.size, raw.landmarks)
    }
}

impl World {
    /// Creates a new `World`.
    ///
    /// Returns an error if `size` is not positive, there are no landmarks or
    /// a landmark is not finite.
    pub fn try_new(size: f64, landmarks: Vec<Point2<f64>>) -> Result<Self, Error> {
        let size = check_world_size(size)?;
        if landmarks.is_empty() {
            return Err(Error::EmptyLandmarks);
        }
        if let Some(landmark) = landmarks.iter().find(|l| !(l.x.is_finite() && l.y.is_finite())) {
            return Err(Error::NonFinite {
                quantity: "landmark",
                value: match landmark.x.is_finite() {
                    true => landmark.y,
                    false => landmark.x,
                },
            });
        }

        Ok(Self { size, landmarks })
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn landmarks(&self) -> &[Point2<f64>] {
        &self.landmarks
    }

    pub fn landmark_count(&self) -> usize {
        self.landmarks.len()
    }
}
