use crate::{
    error::Error,
    measurement::Measurement,
    noise::{Noise, gaussian, gaussian_density, gaussian_log_density},
    pose::{Pose, UniformPose},
    world::World,
};
use rand::Rng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A point robot with noisy motion and a noisy range sensor.
///
/// Agents are values: moving one returns a new `Agent` and leaves the original
/// untouched, so a resampled particle set can hold the same agent many times.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Agent {
    pose: Pose,
    noise: Noise,
}

impl Agent {
    /// Creates a noise-free `Agent` at `pose`.
    pub fn new(pose: Pose) -> Self {
        Self {
            pose,
            noise: Noise::zero(),
        }
    }

    /// Creates a noise-free `Agent` at a uniformly random pose in `world`.
    pub fn random<R: Rng + ?Sized>(world: &World, rng: &mut R) -> Result<Self, Error> {
        Ok(Self::new(rng.sample(UniformPose::try_new(world.size())?)))
    }

    /// Returns a copy of this agent with `noise`.
    pub fn with_noise(self, noise: Noise) -> Self {
        Self { noise, ..self }
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn noise(&self) -> &Noise {
        &self.noise
    }

    /// Turns by `turn` radians and then drives `forward`, both perturbed by
    /// this agent's motion noise.
    ///
    /// The heading noise is drawn before the distance noise. The new position
    /// wraps around the edges of `world`. Noise large enough to push the pose
    /// past the range of `f64` is an error.
    pub fn moved<R: Rng + ?Sized>(
        &self,
        world: &World,
        turn: f64,
        forward: f64,
        rng: &mut R,
    ) -> Result<Self, Error> {
        if !(turn.is_finite() && forward.is_finite() && forward >= 0.0) {
            return Err(Error::InvalidMotion { turn, forward });
        }

        let heading = self.pose.heading() + turn + gaussian(rng, self.noise.turn())?;
        let distance = forward + gaussian(rng, self.noise.forward())?;

        Ok(Self {
            pose: Pose::wrap(
                self.pose.x() + heading.cos() * distance,
                self.pose.y() + heading.sin() * distance,
                heading,
                world.size(),
            )?,
            noise: self.noise,
        })
    }

    /// Noise-free ranges from this agent to every landmark in `world`.
    pub fn exact_ranges(&self, world: &World) -> Measurement {
        world
            .landmarks()
            .iter()
            .map(|landmark| self.pose.distance_to(landmark))
            .collect()
    }

    /// Measures the range to every landmark in `world`, adding independent
    /// sense noise to each.
    pub fn sense<R: Rng + ?Sized>(&self, world: &World, rng: &mut R) -> Result<Measurement, Error> {
        world
            .landmarks()
            .iter()
            .map(|landmark| -> Result<f64, Error> {
                let range = self.pose.distance_to(landmark) + gaussian(rng, self.noise.sense())?;
                match range.is_finite() {
                    true => Ok(range),
                    false => Err(Error::NonFinite {
                        quantity: "range",
                        value: range,
                    }),
                }
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Measurement::new)
    }

    /// Density of `observation` given that this agent is where it thinks it is.
    ///
    /// Landmarks are treated as independent, so this is the product of one
    /// Gaussian density per range. The product underflows to zero for large
    /// residuals; [`Agent::log_likelihood`] does not.
    pub fn measurement_likelihood(
        &self,
        world: &World,
        observation: &Measurement,
    ) -> Result<f64, Error> {
        self.residuals(world, observation)?
            .try_fold(1.0, |prob, (expected, observed)| -> Result<f64, Error> {
                Ok(prob * gaussian_density(expected, self.noise.sense(), observed)?)
            })
    }

    /// Natural log of [`Agent::measurement_likelihood`], computed as a sum.
    pub fn log_likelihood(&self, world: &World, observation: &Measurement) -> Result<f64, Error> {
        self.residuals(world, observation)?
            .try_fold(0.0, |sum, (expected, observed)| -> Result<f64, Error> {
                Ok(sum + gaussian_log_density(expected, self.noise.sense(), observed)?)
            })
    }

    fn residuals<'a>(
        &'a self,
        world: &'a World,
        observation: &'a Measurement,
    ) -> Result<impl Iterator<Item = (f64, f64)> + 'a, Error> {
        if observation.len() != world.landmark_count() {
            return Err(Error::DimensionMismatch {
                expected: world.landmark_count(),
                actual: observation.len(),
            });
        }

        Ok(world
            .landmarks()
            .iter()
            .map(|landmark| self.pose.distance_to(landmark))
            .zip(observation.ranges().iter().copied()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point2;
    use rand::{SeedableRng, rngs::StdRng};
    use rstest::rstest;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn world() -> World {
        World::try_new(
            100.0,
            vec![
                Point2::new(20.0, 20.0),
                Point2::new(80.0, 80.0),
                Point2::new(20.0, 80.0),
                Point2::new(80.0, 20.0),
            ],
        )
        .unwrap()
    }

    fn agent(x: f64, y: f64, heading: f64) -> Agent {
        Agent::new(Pose::try_new(x, y, heading, 100.0).unwrap())
    }

    #[test]
    fn zero_noise_stands_still() {
        let mut rng = StdRng::seed_from_u64(0);
        let start = agent(30.0, 50.0, FRAC_PI_2);
        let moved = start.moved(&world(), 0.0, 0.0, &mut rng).unwrap();
        assert_eq!(moved, start);
    }

    #[test]
    fn zero_noise_drives_straight() {
        let mut rng = StdRng::seed_from_u64(0);
        let moved = agent(30.0, 50.0, 0.0)
            .moved(&world(), FRAC_PI_2, 10.0, &mut rng)
            .unwrap();
        assert_relative_eq!(moved.pose().x(), 30.0, epsilon = 1e-9);
        assert_relative_eq!(moved.pose().y(), 60.0, epsilon = 1e-9);
        assert_relative_eq!(moved.pose().heading(), FRAC_PI_2);
    }

    #[test]
    fn moving_wraps_around_edges() {
        let mut rng = StdRng::seed_from_u64(0);
        let moved = agent(95.0, 50.0, 0.0)
            .moved(&world(), 0.0, 10.0, &mut rng)
            .unwrap();
        assert_relative_eq!(moved.pose().x(), 5.0, epsilon = 1e-9);

        let moved = agent(50.0, 2.0, 0.0)
            .moved(&world(), -FRAC_PI_2, 5.0, &mut rng)
            .unwrap();
        assert_relative_eq!(moved.pose().y(), 97.0, epsilon = 1e-9);
        assert_relative_eq!(moved.pose().heading(), 1.5 * PI);
    }

    #[test]
    fn moving_leaves_original_untouched() {
        let mut rng = StdRng::seed_from_u64(1);
        let noise = Noise::try_new(1.0, 0.1, 1.0).unwrap();
        let start = agent(30.0, 50.0, 1.0).with_noise(noise);
        let copy = start;
        let moved = start.moved(&world(), 0.4, 1.0, &mut rng).unwrap();
        assert_eq!(start, copy);
        assert_ne!(moved, start);
        assert_eq!(moved.noise(), &noise);
    }

    #[test]
    fn same_seed_same_motion() {
        let noise = Noise::try_new(4.0, 0.2, 5.0).unwrap();
        let start = agent(30.0, 50.0, FRAC_PI_2).with_noise(noise);
        let a = start
            .moved(&world(), 0.4, 1.0, &mut StdRng::seed_from_u64(42))
            .unwrap();
        let b = start
            .moved(&world(), 0.4, 1.0, &mut StdRng::seed_from_u64(42))
            .unwrap();
        assert_eq!(a, b);
    }

    #[rstest]
    #[case(0.0, -1.0)]
    #[case(0.0, f64::NAN)]
    #[case(f64::INFINITY, 1.0)]
    fn invalid_motion(#[case] turn: f64, #[case] forward: f64) {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            agent(30.0, 50.0, 0.0).moved(&world(), turn, forward, &mut rng),
            Err(Error::InvalidMotion { .. })
        ));
    }

    #[test]
    fn noise_free_sensing_is_exact() {
        let mut rng = StdRng::seed_from_u64(0);
        let robot = agent(20.0, 50.0, 0.0);
        let ranges = robot.sense(&world(), &mut rng).unwrap();
        assert_eq!(ranges, robot.exact_ranges(&world()));
        assert_relative_eq!(ranges.ranges()[0], 30.0);
        assert_relative_eq!(ranges.ranges()[2], 30.0);
        assert_relative_eq!(ranges.ranges()[1], (60.0f64.powi(2) + 30.0f64.powi(2)).sqrt());
    }

    fn mean_and_std_dev(values: &[f64]) -> (f64, f64) {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        (mean, variance.sqrt())
    }

    #[test]
    fn sense_noise_drawn_per_landmark() {
        let mut rng = StdRng::seed_from_u64(9);
        let robot = agent(30.0, 50.0, 0.0).with_noise(Noise::try_new(0.0, 0.0, 5.0).unwrap());
        let exact = robot.exact_ranges(&world());

        let mut residuals = Vec::new();
        for _ in 0..500 {
            let ranges = robot.sense(&world(), &mut rng).unwrap();
            assert_ne!(ranges, exact);

            let step: Vec<f64> = ranges
                .ranges()
                .iter()
                .zip(exact.ranges())
                .map(|(measured, true_range)| measured - true_range)
                .collect();
            assert!(step.windows(2).all(|pair| pair[0] != pair[1]));
            residuals.extend(step);
        }

        let (mean, std_dev) = mean_and_std_dev(&residuals);
        assert!(mean.abs() < 0.5, "mean residual {mean}");
        assert_relative_eq!(std_dev, 5.0, max_relative = 0.1);
    }

    #[test]
    fn motion_noise_matches_configured_spread() {
        let noise = Noise::try_new(2.0, 0.1, 0.0).unwrap();
        let start = agent(50.0, 50.0, 1.0).with_noise(noise);
        let mut rng = StdRng::seed_from_u64(17);

        let mut turns = Vec::new();
        let mut distances = Vec::new();
        for _ in 0..2000 {
            let moved = start.moved(&world(), 0.5, 10.0, &mut rng).unwrap();
            turns.push(moved.pose().heading() - 1.5);
            distances.push(
                moved
                    .pose()
                    .toroidal_distance_squared(start.pose(), 100.0)
                    .sqrt(),
            );
        }

        let (turn_mean, turn_std_dev) = mean_and_std_dev(&turns);
        assert!(turn_mean.abs() < 0.01, "mean turn error {turn_mean}");
        assert_relative_eq!(turn_std_dev, 0.1, max_relative = 0.1);

        let (distance_mean, distance_std_dev) = mean_and_std_dev(&distances);
        assert!((distance_mean - 10.0).abs() < 0.2, "mean distance {distance_mean}");
        assert_relative_eq!(distance_std_dev, 2.0, max_relative = 0.1);
    }

    #[rstest]
    #[case(Noise::try_new(1e308, 0.0, 1.0).unwrap(), "x")]
    #[case(Noise::try_new(0.0, 1e308, 1.0).unwrap(), "heading")]
    fn huge_motion_noise_fails_cleanly(#[case] noise: Noise, #[case] quantity: &str) {
        let start = agent(30.0, 50.0, 0.0).with_noise(noise);

        let mut failures = 0;
        for seed in 0..200 {
            match start.moved(&world(), 0.0, 1.0, &mut StdRng::seed_from_u64(seed)) {
                Ok(moved) => assert!(moved.pose().validate(100.0).is_ok()),
                Err(Error::NonFinite { quantity: q, .. }) => {
                    assert_eq!(q, quantity);
                    failures += 1;
                }
                Err(other) => panic!("unexpected error {other:?}"),
            }
        }

        // A draw beyond about 1.8 sigma overflows.
        assert!(failures > 0);
    }

    #[test]
    fn huge_sense_noise_fails_cleanly() {
        let robot = agent(30.0, 50.0, 0.0).with_noise(Noise::try_new(0.0, 0.0, 1e308).unwrap());
        let failures = (0..100)
            .map(|seed| robot.sense(&world(), &mut StdRng::seed_from_u64(seed)))
            .filter(|ranges| {
                matches!(
                    ranges,
                    Err(Error::NonFinite {
                        quantity: "range",
                        ..
                    })
                )
            })
            .count();
        assert!(failures > 0);
    }

    #[test]
    fn likelihood_peak_single_landmark() {
        let world = World::try_new(100.0, vec![Point2::new(12.445, 0.0)]).unwrap();
        let robot = agent(0.0, 0.0, 0.0).with_noise(Noise::try_new(0.0, 0.0, 5.0).unwrap());
        let observation = Measurement::new(vec![12.445]);

        let peak = robot.measurement_likelihood(&world, &observation).unwrap();
        assert_relative_eq!(peak, 1.0 / (2.0 * PI * 25.0).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(peak, 0.07979, epsilon = 1e-5);

        for offset in [-3.0, -0.5, 0.1, 2.0] {
            let off_peak = robot
                .measurement_likelihood(&world, &Measurement::new(vec![12.445 + offset]))
                .unwrap();
            assert!(off_peak < peak);
        }
    }

    #[test]
    fn likelihood_is_product_of_densities() {
        let robot = agent(30.0, 50.0, 0.0).with_noise(Noise::try_new(0.0, 0.0, 5.0).unwrap());
        let observation = Measurement::new(vec![28.954898, 55.8679245, 53.9708025, 29.2746963]);
        let expected: f64 = robot
            .exact_ranges(&world())
            .ranges()
            .iter()
            .zip(observation.ranges())
            .map(|(&mu, &x)| gaussian_density(mu, 5.0, x).unwrap())
            .product();

        let prob = robot.measurement_likelihood(&world(), &observation).unwrap();
        assert_relative_eq!(prob, expected);
        assert_relative_eq!(
            robot.log_likelihood(&world(), &observation).unwrap(),
            expected.ln(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn likelihood_dimension_mismatch() {
        let robot = agent(30.0, 50.0, 0.0).with_noise(Noise::try_new(0.0, 0.0, 5.0).unwrap());
        assert_eq!(
            robot.measurement_likelihood(&world(), &Measurement::new(vec![1.0, 2.0])),
            Err(Error::DimensionMismatch {
                expected: 4,
                actual: 2
            })
        );
    }

    #[test]
    fn likelihood_needs_sense_noise() {
        let robot = agent(30.0, 50.0, 0.0);
        let observation = robot.exact_ranges(&world());
        assert!(matches!(
            robot.measurement_likelihood(&world(), &observation),
            Err(Error::InvalidParameter { .. })
        ));
    }
}
