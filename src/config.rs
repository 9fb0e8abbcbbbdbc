use crate::{
    error::Error,
    estimator::{Control, Weighting},
    noise::Noise,
    pose::{Pose, check_world_size},
    resample::{DEFAULT_JITTER, WheelResampler},
};
use nalgebra::Point2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

/// Everything needed to set up and run a localisation scenario.
///
/// The default is the reference scenario: a 100 x 100 world with a landmark
/// near each corner, a target starting at (30, 50) facing +Y, and 20 particles
/// following ten steps of `turn = 0.4, forward = 1`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FilterParams {
    /// Side length of the square toroidal world.
    pub world_size: f64,

    /// Landmark locations, in measurement order.
    pub landmarks: Vec<Point2<f64>>,

    /// Number of particles, fixed for the whole run.
    pub particle_count: usize,

    /// Starting pose of the true robot.
    pub target: Pose,
    pub target_noise: Noise,
    pub particle_noise: Noise,

    /// Control applied at every step.
    pub control: Control,
    pub steps: usize,

    /// Stride multiplier of the resampling wheel.
    pub jitter: f64,
    pub weighting: Weighting,
}

impl FilterParams {
    /// Checks every parameter, returning the first problem found.
    pub fn validate(&self) -> Result<(), Error> {
        check_world_size(self.world_size)?;
        if self.landmarks.is_empty() {
            return Err(Error::EmptyLandmarks);
        }
        if self.particle_count == 0 {
            return Err(Error::invalid_parameter(
                "particle count",
                0.0,
                "a particle set needs at least one particle",
            ));
        }

        self.target.validate(self.world_size)?;
        WheelResampler::try_new(self.jitter)?;

        let Control { turn, forward } = self.control;
        if !(turn.is_finite() && forward.is_finite() && forward >= 0.0) {
            return Err(Error::InvalidMotion { turn, forward });
        }

        Ok(())
    }

    /// The control sequence: `control` repeated `steps` times.
    pub fn controls(&self) -> impl Iterator<Item = Control> + use<> {
        std::iter::repeat_n(self.control, self.steps)
    }
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            world_size: 100.0,
            landmarks: vec![
                Point2::new(20.0, 20.0),
                Point2::new(80.0, 80.0),
                Point2::new(20.0, 80.0),
                Point2::new(80.0, 20.0),
            ],
            particle_count: 20,
            target: Pose::new_unchecked(30.0, 50.0, FRAC_PI_2),
            target_noise: Noise::new_unchecked(4.0, 0.2, 5.0),
            particle_noise: Noise::new_unchecked(0.05, 0.05, 5.0),
            control: Control::new(0.4, 1.0),
            steps: 10,
            jitter: DEFAULT_JITTER,
            weighting: Weighting::Probability,
        }
    }
}
