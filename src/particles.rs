use crate::{
    agent::Agent,
    error::Error,
    measurement::Measurement,
    noise::Noise,
    pose::{Pose, wrap_into},
    world::World,
};
use nalgebra::Point2;
use rand::Rng;
use rayon::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// An ordered set of particles approximating the belief over the robot's pose.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawParticleSet"))]
pub struct ParticleSet {
    agents: Vec<Agent>,
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawParticleSet {
    agents: Vec<Agent>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawParticleSet> for ParticleSet {
    type Error = Error;

    fn try_from(raw: RawParticleSet) -> Result<Self, Self::Error> {
        Self::try_new(raw.agents)
    }
}

impl ParticleSet {
    /// Creates a new `ParticleSet` from `agents`.
    ///
    /// Returns an error if `agents` is empty.
    pub fn try_new(agents: Vec<Agent>) -> Result<Self, Error> {
        if agents.is_empty() {
            return Err(Error::invalid_parameter(
                "particle count",
                0.0,
                "a particle set needs at least one particle",
            ));
        }

        Ok(Self { agents })
    }

    /// Draws `count` particles at uniformly random poses, all with `noise`.
    pub fn random<R: Rng + ?Sized>(
        world: &World,
        count: usize,
        noise: Noise,
        rng: &mut R,
    ) -> Result<Self, Error> {
        let agents = (0..count)
            .map(|_| -> Result<Agent, Error> { Ok(Agent::random(world, rng)?.with_noise(noise)) })
            .collect::<Result<Vec<_>, Error>>()?;
        Self::try_new(agents)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Agent> {
        self.agents.iter()
    }

    pub fn poses(&self) -> impl Iterator<Item = &Pose> {
        self.agents.iter().map(Agent::pose)
    }

    /// Moves every particle by the same control, each drawing its own noise.
    ///
    /// Particles draw from `rng` in order, so the result is reproducible.
    pub fn moved<R: Rng + ?Sized>(
        &self,
        world: &World,
        turn: f64,
        forward: f64,
        rng: &mut R,
    ) -> Result<Self, Error> {
        let agents = self
            .agents
            .iter()
            .map(|agent| agent.moved(world, turn, forward, rng))
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(Self { agents })
    }

    /// Likelihood of `observation` for every particle, in particle order.
    pub fn likelihoods(&self, world: &World, observation: &Measurement) -> Result<Vec<f64>, Error> {
        self.agents
            .par_iter()
            .map(|agent| agent.measurement_likelihood(world, observation))
            .collect()
    }

    /// Log likelihood of `observation` for every particle, in particle order.
    pub fn log_likelihoods(
        &self,
        world: &World,
        observation: &Measurement,
    ) -> Result<Vec<f64>, Error> {
        self.agents
            .par_iter()
            .map(|agent| agent.log_likelihood(world, observation))
            .collect()
    }

    /// Mean particle position, averaging each axis as an angle around the
    /// torus so that particles straddling an edge average to the edge.
    pub fn mean_position(&self, world_size: f64) -> Point2<f64> {
        let mean = |coord: fn(&Pose) -> f64| {
            let (sin, cos) = self.poses().fold((0.0, 0.0), |(sin, cos), pose| {
                let angle = coord(pose) / world_size * TAU;
                (sin + angle.sin(), cos + angle.cos())
            });
            wrap_into(sin.atan2(cos) / TAU * world_size, world_size)
        };

        Point2::new(mean(Pose::x), mean(Pose::y))
    }

    /// Mean squared toroidal distance from each particle to `pose`.
    pub fn mean_squared_error(&self, pose: &Pose, world_size: f64) -> f64 {
        self.poses()
            .map(|particle| particle.toroidal_distance_squared(pose, world_size))
            .sum::<f64>()
            / self.len() as f64
    }
}

impl<'a> IntoIterator for &'a ParticleSet {
    type Item = &'a Agent;
    type IntoIter = std::slice::Iter<'a, Agent>;

    fn into_iter(self) -> Self::IntoIter {
        self.agents.iter()
    }
}
