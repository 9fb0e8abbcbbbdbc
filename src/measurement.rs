#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Ranges from an agent to every landmark, in landmark order.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Measurement {
    ranges: Vec<f64>,
}

impl Measurement {
    pub fn new(ranges: Vec<f64>) -> Self {
        Self { ranges }
    }

    pub fn ranges(&self) -> &[f64] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

impl FromIterator<f64> for Measurement {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
