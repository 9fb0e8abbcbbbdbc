use crate::{
    agent::Agent,
    config::FilterParams,
    error::Error,
    measurement::Measurement,
    particles::ParticleSet,
    pose::Pose,
    resample::{Resample, WheelResampler, effective_sample_size},
    world::World,
};
use nalgebra::Point2;
use rand::Rng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A control input: turn by `turn` radians, then drive `forward`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Control {
    pub turn: f64,
    pub forward: f64,
}

impl Control {
    pub fn new(turn: f64, forward: f64) -> Self {
        Self { turn, forward }
    }
}

/// How particle weights are computed from a measurement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Weighting {
    /// Multiply per-landmark densities directly.
    #[default]
    Probability,

    /// Sum per-landmark log densities and rescale by the largest one before
    /// exponentiating.
    ///
    /// This gives the probability weights up to a common positive factor, so
    /// resampling selects the same particles while avoiding underflow.
    LogSpace,
}

impl Weighting {
    /// Weights of every particle in `particles` for `observation`.
    pub fn weights(
        &self,
        particles: &ParticleSet,
        world: &World,
        observation: &Measurement,
    ) -> Result<Vec<f64>, Error> {
        match self {
            Weighting::Probability => particles.likelihoods(world, observation),
            Weighting::LogSpace => {
                let log_weights = particles.log_likelihoods(world, observation)?;
                let max = log_weights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                if max == f64::NEG_INFINITY {
                    return Ok(vec![0.0; log_weights.len()]);
                }

                Ok(log_weights.iter().map(|l| (l - max).exp()).collect())
            }
        }
    }
}

/// Everything produced by one filter step.
///
/// Snapshots are detached copies; changing the estimator afterwards does not
/// change them.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Snapshot {
    step: usize,
    target: Agent,
    measurement: Measurement,
    particles: ParticleSet,
}

impl Snapshot {
    /// One-based index of the step that produced this snapshot.
    pub fn step(&self) -> usize {
        self.step
    }

    /// The true robot after this step's motion.
    pub fn target(&self) -> &Agent {
        &self.target
    }

    /// The ranges the true robot measured during this step.
    pub fn measurement(&self) -> &Measurement {
        &self.measurement
    }

    /// The resampled particles.
    pub fn particles(&self) -> &ParticleSet {
        &self.particles
    }

    /// Mean squared distance from the particles to the true robot.
    pub fn mean_squared_error(&self, world_size: f64) -> f64 {
        self.particles
            .mean_squared_error(self.target.pose(), world_size)
    }
}

/// Receives a snapshot after every completed filter step.
pub trait SnapshotSink {
    fn record(&mut self, snapshot: &Snapshot);
}

impl SnapshotSink for Vec<Snapshot> {
    fn record(&mut self, snapshot: &Snapshot) {
        self.push(snapshot.clone());
    }
}

/// Tracks a simulated robot with a particle filter.
///
/// The estimator owns the ground-truth robot (the target) and the particle
/// set. Each [`Estimator::step`] moves the target, takes a noisy measurement
/// from it, moves every particle by the same control, weights the particles
/// against the measurement, and resamples them.
pub struct Estimator<S = WheelResampler> {
    world: World,
    target: Agent,
    particles: ParticleSet,
    resampler: S,
    weighting: Weighting,
    steps: usize,
}

impl<S> Estimator<S> {
    /// Creates a new `Estimator`.
    ///
    /// Returns an error if the target or any particle lies outside `world`.
    pub fn try_new(
        world: World,
        target: Agent,
        particles: ParticleSet,
        resampler: S,
    ) -> Result<Self, Error> {
        target.pose().validate(world.size())?;
        particles
            .poses()
            .try_for_each(|pose| pose.validate(world.size()))?;

        Ok(Self {
            world,
            target,
            particles,
            resampler,
            weighting: Weighting::default(),
            steps: 0,
        })
    }

    pub fn with_weighting(self, weighting: Weighting) -> Self {
        Self { weighting, ..self }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn target(&self) -> &Agent {
        &self.target
    }

    pub fn particles(&self) -> &ParticleSet {
        &self.particles
    }

    pub fn weighting(&self) -> Weighting {
        self.weighting
    }

    /// Number of completed steps.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Mean squared distance from the particles to the true robot.
    pub fn mean_squared_error(&self) -> f64 {
        self.particles
            .mean_squared_error(self.target.pose(), self.world.size())
    }

    /// Mean particle position as an estimate of where the robot is.
    pub fn estimated_position(&self) -> Point2<f64> {
        self.particles.mean_position(self.world.size())
    }
}

impl<S: Resample> Estimator<S> {
    /// Runs one filter step with `control`.
    ///
    /// On error the estimator keeps the target and particles it had before
    /// the step.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        control: Control,
        rng: &mut R,
    ) -> Result<Snapshot, Error> {
        let target = self
            .target
            .moved(&self.world, control.turn, control.forward, rng)?;
        let measurement = target.sense(&self.world, rng)?;

        let moved = self
            .particles
            .moved(&self.world, control.turn, control.forward, rng)?;
        let weights = self.weighting.weights(&moved, &self.world, &measurement)?;
        let particles =
            ParticleSet::try_new(self.resampler.resample(moved.agents(), &weights, rng)?)?;

        self.target = target;
        self.particles = particles;
        self.steps += 1;

        debug!(
            step = self.steps,
            particles = self.particles.len(),
            effective_sample_size = effective_sample_size(&weights),
            mean_squared_error = self.mean_squared_error(),
            "completed filter step"
        );

        Ok(Snapshot {
            step: self.steps,
            target: self.target,
            measurement,
            particles: self.particles.clone(),
        })
    }

    /// Runs one step per control, handing every snapshot to `sink`.
    ///
    /// Stops at the first failing step. Returns the number of steps completed.
    pub fn run<R, I, K>(&mut self, controls: I, rng: &mut R, sink: &mut K) -> Result<usize, Error>
    where
        R: Rng + ?Sized,
        I: IntoIterator<Item = Control>,
        K: SnapshotSink + ?Sized,
    {
        let mut completed = 0;
        for control in controls {
            let snapshot = self.step(control, rng)?;
            sink.record(&snapshot);
            completed += 1;
        }

        Ok(completed)
    }
}

impl Estimator<WheelResampler> {
    /// Builds an estimator from `params`, drawing the initial particles
    /// uniformly over the world.
    pub fn from_params<R: Rng + ?Sized>(params: &FilterParams, rng: &mut R) -> Result<Self, Error> {
        params.validate()?;

        let world = World::try_new(params.world_size, params.landmarks.clone())?;
        let target = Agent::new(Pose::try_new(
            params.target.x(),
            params.target.y(),
            params.target.heading(),
            world.size(),
        )?)
        .with_noise(params.target_noise);
        let particles =
            ParticleSet::random(&world, params.particle_count, params.particle_noise, rng)?;

        Ok(Self::try_new(
            world,
            target,
            particles,
            WheelResampler::try_new(params.jitter)?,
        )?
        .with_weighting(params.weighting))
    }
}
