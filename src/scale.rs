use std::f64::consts::{FRAC_PI_2, PI};

/*
 * The scale function k(q) maps a rank fraction q in [0, 1] to a potential. A
 * centroid spanning ranks [q_left, q_right] is allowed to grow as long as
 *
 *   k(q_right) - k(q_left) <= 1
 *
 * Both functions below have a derivative that diverges (K1) or grows
 * logarithmically (K2) towards q = 0 and q = 1, so centroids at the tails
 * are forced to stay small.
 *
 * K1:
 *   k(q)     = d / (2 pi) * asin(2q - 1)           range [-d/4, d/4]
 *   k_inv(k) = (sin(2 pi k / d) + 1) / 2
 *
 * K2:
 *   k(q)     = d * ln(q / (1 - q)) / Z             Z = 4 ln(n / d) + 24
 *   k_inv(k) = 1 / (1 + exp(-k Z / d))
 *
 * Z depends on the total weight n and is recomputed at every compression.
 */

/// Scale function governing how large a centroid may grow at a given rank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ScaleFunction {
    /// Arcsine scale. Centroid count is bounded by the compression alone.
    #[default]
    K1,

    /// Logistic scale normalized by the total weight. Tails stay accurate
    /// with fewer centroids than K1.
    K2,
}

impl ScaleFunction {
    pub(crate) fn tag(self) -> u8 {
        match self {
            ScaleFunction::K1 => 0,
            ScaleFunction::K2 => 1,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(ScaleFunction::K1),
            1 => Some(ScaleFunction::K2),
            _ => None,
        }
    }
}

/// A scale function bound to a compression, with its constants precomputed.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Scaler {
    function: ScaleFunction,
    compression: f64,
    // Multiplier applied to the raw potential to get k.
    to_k: f64,
    // Multiplier applied to k to get back to the raw potential.
    from_k: f64,
}

impl Scaler {
    pub fn new(function: ScaleFunction, compression: f64) -> Self {
        let scaler = Self {
            function,
            compression,
            to_k: compression / (2.0 * PI),
            from_k: 2.0 * PI / compression,
        };
        match function {
            ScaleFunction::K1 => scaler,
            ScaleFunction::K2 => scaler.normalized(0.0),
        }
    }

    /// Returns a scaler fitted to a digest holding `total_weight`.
    ///
    /// Only K2 depends on the total weight; K1 is returned unchanged.
    pub fn normalized(self, total_weight: f64) -> Self {
        match self.function {
            ScaleFunction::K1 => self,
            ScaleFunction::K2 => {
                let z = 4.0 * (total_weight / self.compression).max(1.0).ln() + 24.0;
                Self {
                    to_k: self.compression / z,
                    from_k: z / self.compression,
                    ..self
                }
            }
        }
    }

    pub fn k(&self, q: f64) -> f64 {
        match self.function {
            ScaleFunction::K1 => self.to_k * (2.0 * q - 1.0).clamp(-1.0, 1.0).asin(),
            ScaleFunction::K2 => {
                if q <= 0.0 {
                    f64::NEG_INFINITY
                } else if q >= 1.0 {
                    f64::INFINITY
                } else {
                    self.to_k * (q / (1.0 - q)).ln()
                }
            }
        }
    }

    pub fn k_inv(&self, k: f64) -> f64 {
        match self.function {
            ScaleFunction::K1 => {
                // Past +-d/4 the sine folds back, so saturate at the ends.
                let angle = (k * self.from_k).clamp(-FRAC_PI_2, FRAC_PI_2);
                (angle.sin() + 1.0) / 2.0
            }
            ScaleFunction::K2 => 1.0 / (1.0 + (-k * self.from_k).exp()),
        }
    }

    /// Largest rank fraction a centroid starting at `q_start` may reach.
    #[inline]
    pub fn q_limit(&self, q_start: f64) -> f64 {
        self.k_inv(self.k(q_start) + 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn k1_round_trips() {
        let scaler = Scaler::new(ScaleFunction::K1, 100.0);
        for i in 0..=100 {
            let q = i as f64 / 100.0;
            let back = scaler.k_inv(scaler.k(q));
            assert!(approx_eq!(f64, q, back, epsilon = 1e-12), "q={} back={}", q, back);
        }
    }

    #[test]
    fn k1_spans_half_the_compression() {
        let scaler = Scaler::new(ScaleFunction::K1, 100.0);
        assert!(approx_eq!(f64, scaler.k(0.0), -25.0, epsilon = 1e-9));
        assert!(approx_eq!(f64, scaler.k(1.0), 25.0, epsilon = 1e-9));
        assert!(approx_eq!(f64, scaler.k(0.5), 0.0, epsilon = 1e-12));
    }

    #[test]
    fn k1_limit_saturates_at_one() {
        let scaler = Scaler::new(ScaleFunction::K1, 100.0);
        assert_eq!(scaler.q_limit(1.0), 1.0);
        assert_eq!(scaler.k_inv(1_000.0), 1.0);
        assert_eq!(scaler.k_inv(-1_000.0), 0.0);
    }

    #[test]
    fn limits_are_tighter_at_the_tails() {
        for function in [ScaleFunction::K1, ScaleFunction::K2] {
            let scaler = Scaler::new(function, 100.0).normalized(100_000.0);
            let tail = scaler.q_limit(0.001) - 0.001;
            let middle = scaler.q_limit(0.5) - 0.5;
            assert!(tail > 0.0);
            assert!(tail < middle, "{:?}: tail={} middle={}", function, tail, middle);
        }
    }

    #[test]
    fn k2_round_trips_and_is_monotone() {
        let scaler = Scaler::new(ScaleFunction::K2, 200.0).normalized(1_000_000.0);
        let mut last = f64::NEG_INFINITY;
        for i in 1..100 {
            let q = i as f64 / 100.0;
            let k = scaler.k(q);
            assert!(k > last);
            last = k;
            assert!(approx_eq!(f64, q, scaler.k_inv(k), epsilon = 1e-12));
        }
        assert_eq!(scaler.k(0.0), f64::NEG_INFINITY);
        assert_eq!(scaler.k(1.0), f64::INFINITY);
        assert_eq!(scaler.k_inv(f64::INFINITY), 1.0);
    }

    #[test]
    fn k2_normalizer_never_collapses() {
        // With fewer samples than the compression the normalizer bottoms out.
        let small = Scaler::new(ScaleFunction::K2, 10_000.0).normalized(1.0);
        let fresh = Scaler::new(ScaleFunction::K2, 10_000.0);
        assert_eq!(small.to_k, fresh.to_k);
        assert!(small.to_k > 0.0);
    }

    #[test]
    fn tags_round_trip() {
        for function in [ScaleFunction::K1, ScaleFunction::K2] {
            assert_eq!(ScaleFunction::from_tag(function.tag()), Some(function));
        }
        assert_eq!(ScaleFunction::from_tag(7), None);
    }
}
