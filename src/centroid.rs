use float_ord::FloatOrd;
use std::{
    cmp::Ordering,
    ops::{Add, AddAssign},
};

/// A cluster of samples summarized by their weighted mean and total weight.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Centroid {
    pub(crate) mean: f64,
    pub(crate) weight: f64,
}

impl PartialEq for Centroid {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.mean == other.mean && self.weight == other.weight
    }
}

impl PartialOrd for Centroid {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for Centroid {}

impl Ord for Centroid {
    /// Orders by mean, then by weight.
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl Add for Centroid {
    type Output = Self;

    #[inline]
    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

impl AddAssign for Centroid {
    /// Absorbs `rhs`, moving the mean towards it in proportion to its weight.
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        let weight = self.weight + rhs.weight;
        let share = rhs.weight / weight;
        let delta = rhs.mean - self.mean;
        // Incremental form keeps precision across long absorption chains.
        if delta.is_finite() {
            self.mean += delta * share;
        } else {
            // Means of opposite sign near the limits of f64.
            self.mean = self.mean * (self.weight / weight) + rhs.mean * share;
        }
        self.weight = weight;
    }
}

impl Centroid {
    #[inline]
    pub fn new(mean: f64, weight: f64) -> Self {
        Self { mean, weight }
    }

    #[inline]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    #[inline]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Whether this centroid stands for exactly one unit-weight observation.
    #[inline]
    pub fn is_singleton(&self) -> bool {
        self.weight == 1.0
    }

    #[inline]
    pub(crate) fn is_valid(&self) -> bool {
        self.mean.is_finite() && self.weight.is_finite() && self.weight > 0.0
    }

    #[inline]
    pub(crate) fn sort_key(&self) -> (FloatOrd<f64>, FloatOrd<f64>) {
        (FloatOrd(self.mean), FloatOrd(self.weight))
    }
}
