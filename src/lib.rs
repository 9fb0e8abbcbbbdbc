// #![warn(missing_docs)]

//! Particle Filter Localisation
//!
//! Tracks the pose of a robot in a square toroidal world from noisy ranges to
//! landmarks at known locations. All randomness comes from a caller-supplied
//! [`rand::Rng`], so a run is reproducible from its seed.
//!
//! ```
//! use localise::prelude::*;
//! use rand::{SeedableRng, rngs::StdRng};
//!
//! let params = FilterParams::default();
//! let mut rng = StdRng::seed_from_u64(42);
//! let mut estimator = Estimator::from_params(&params, &mut rng).unwrap();
//!
//! let mut snapshots: Vec<Snapshot> = Vec::new();
//! let steps = estimator
//!     .run(params.controls(), &mut rng, &mut snapshots)
//!     .unwrap();
//! assert_eq!(steps, params.steps);
//! ```

#[allow(missing_docs)]
pub mod error;

pub mod agent;
pub mod config;
pub mod estimator;
pub mod measurement;
pub mod noise;
pub mod particles;
pub mod pose;
pub mod resample;
pub mod world;

pub mod prelude {
    pub use crate::agent::Agent;
    pub use crate::config::FilterParams;
    pub use crate::error::Error;
    pub use crate::estimator::{Control, Estimator, Snapshot, SnapshotSink, Weighting};
    pub use crate::measurement::Measurement;
    pub use crate::noise::Noise;
    pub use crate::particles::ParticleSet;
    pub use crate::pose::{Pose, UniformPose};
    pub use crate::resample::{Resample, WheelResampler};
    pub use crate::world::World;
}
