use crate::{
    centroid::*,
    compressor::compress_into,
    config::TDigestConfig,
    error::*,
    scale::Scaler,
};
use snafu::ensure;
use tracing::{debug, trace};

/// Streaming approximation of a sample distribution's [quantile
/// function](https://en.wikipedia.org/wiki/Quantile_function).
///
/// Observations are staged in an unsorted buffer and periodically compressed
/// into a sorted run of [Centroid]s whose sizes are bounded by a scale
/// function. Centroids near the tails stay small, so extreme quantiles are
/// estimated with high relative accuracy.
///
/// Queries take `&mut self` because they flush the staging buffer first.
/// Flushing never changes the answer to a query.
#[derive(Debug, Clone)]
pub struct TDigest {
    config: TDigestConfig,
    scaler: Scaler,
    buffer_capacity: usize,
    processed: Vec<Centroid>,
    processed_weight: f64,
    unprocessed: Vec<Centroid>,
    unprocessed_weight: f64,
    // Cumulative weight before each processed centroid.
    offsets: Vec<f64>,
    // Cumulative weight at the midpoint of each processed centroid.
    cumulative: Vec<f64>,
    // Reused as the compression target.
    scratch: Vec<Centroid>,
    sum: f64,
    min: f64,
    max: f64,
}

impl Default for TDigest {
    #[inline]
    fn default() -> Self {
        Self::from_valid_config(TDigestConfig::default())
    }
}

impl TDigest {
    /// Creates an empty digest with the given compression and default settings
    /// otherwise.
    pub fn new(compression: f64) -> Result<Self, TDigestError> {
        Self::with_config(TDigestConfig::default().with_compression(compression))
    }

    /// Creates an empty digest from `config`.
    pub fn with_config(config: TDigestConfig) -> Result<Self, TDigestError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: TDigestConfig) -> Self {
        let buffer_capacity = config.buffer_capacity();
        let max_centroids = config.max_centroids();
        Self {
            config,
            scaler: Scaler::new(config.scale(), config.compression()),
            buffer_capacity,
            processed: Vec::with_capacity(max_centroids),
            processed_weight: 0.0,
            unprocessed: Vec::with_capacity(buffer_capacity),
            unprocessed_weight: 0.0,
            offsets: Vec::with_capacity(max_centroids),
            cumulative: Vec::with_capacity(max_centroids),
            scratch: Vec::with_capacity(max_centroids),
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Rebuilds a digest from an already compressed, validated run of centroids.
    pub(crate) fn from_processed(
        config: TDigestConfig,
        centroids: Vec<Centroid>,
        sum: f64,
        min: f64,
        max: f64,
    ) -> Self {
        let mut digest = Self::from_valid_config(config);
        digest.processed = centroids;
        digest.sum = sum;
        digest.min = min;
        digest.max = max;
        digest.update_cumulative();
        digest
    }

    #[inline]
    pub fn config(&self) -> &TDigestConfig {
        &self.config
    }

    #[inline]
    pub fn compression(&self) -> f64 {
        self.config.compression()
    }

    /// Total weight of all observations.
    #[inline]
    pub fn count(&self) -> f64 {
        self.processed_weight + self.unprocessed_weight
    }

    /// Weighted sum of all observations.
    #[inline]
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Weighted mean of all observations.
    #[inline]
    pub fn mean(&self) -> Option<f64> {
        (!self.is_empty()).then(|| self.sum / self.count())
    }

    /// Minimum of all observations, or `+inf` when empty.
    #[inline]
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Maximum of all observations, or `-inf` when empty.
    #[inline]
    pub fn max(&self) -> f64 {
        self.max
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.processed.is_empty() && self.unprocessed.is_empty()
    }

    /// Number of processed centroids once all pending observations are compressed.
    pub fn centroid_count(&mut self) -> usize {
        self.flush();
        self.processed.len()
    }

    /// The compressed centroids, sorted by mean.
    pub fn centroids(&mut self) -> &[Centroid] {
        self.flush();
        &self.processed
    }

    /// Adds a single observation of weight 1.
    #[inline]
    pub fn insert(&mut self, value: f64) -> Result<(), TDigestError> {
        self.add(value, 1.0)
    }

    /// Adds an observation with the given weight.
    ///
    /// The value must be finite and the weight finite and strictly positive.
    pub fn add(&mut self, value: f64, weight: f64) -> Result<(), TDigestError> {
        self.add_centroid(Centroid::new(value, weight))
    }

    /// Adds a pre-aggregated centroid.
    pub fn add_centroid(&mut self, centroid: Centroid) -> Result<(), TDigestError> {
        ensure!(
            centroid.is_valid(),
            InvalidValueSnafu {
                value: centroid.mean,
                weight: centroid.weight,
            }
        );
        self.push(centroid);
        Ok(())
    }

    /// Adds every value in `values` with weight 1.
    ///
    /// Nothing is added unless all values are finite.
    pub fn add_many(&mut self, values: &[f64]) -> Result<(), TDigestError> {
        if let Some(&value) = values.iter().find(|v| !v.is_finite()) {
            return InvalidValueSnafu { value, weight: 1.0 }.fail();
        }
        for &value in values {
            self.push(Centroid::new(value, 1.0));
        }
        Ok(())
    }

    fn push(&mut self, centroid: Centroid) {
        self.unprocessed_weight += centroid.weight;
        self.sum += centroid.mean * centroid.weight;
        self.min = self.min.min(centroid.mean);
        self.max = self.max.max(centroid.mean);
        self.unprocessed.push(centroid);
        if self.unprocessed.len() >= self.buffer_capacity {
            self.flush();
        }
    }

    /// Merges all of the centroids of `other` into this digest.
    ///
    /// The compression of `self` is kept. `other` is left untouched.
    pub fn merge(&mut self, other: &TDigest) {
        if other.is_empty() {
            return;
        }
        debug!(
            incoming_centroids = other.processed.len() + other.unprocessed.len(),
            incoming_weight = other.count(),
            "Merging digest."
        );
        self.stage(other);
        self.flush();
    }

    /// Merges all of the centroids of `digests` into a new digest built from
    /// `config`, compressing once at the end.
    pub fn merge_digests<'a, I>(config: TDigestConfig, digests: I) -> Result<Self, TDigestError>
    where
        I: IntoIterator<Item = &'a TDigest>,
    {
        let mut merged = Self::with_config(config)?;
        let mut sources = 0usize;
        for digest in digests {
            merged.stage(digest);
            sources += 1;
        }
        debug!(sources, total_weight = merged.count(), "Merging digests.");
        merged.flush();
        Ok(merged)
    }

    fn stage(&mut self, other: &TDigest) {
        self.unprocessed.extend_from_slice(&other.processed);
        self.unprocessed.extend_from_slice(&other.unprocessed);
        self.unprocessed_weight += other.count();
        self.sum += other.sum;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Compresses all pending observations into the processed centroids.
    pub fn flush(&mut self) {
        if self.unprocessed.is_empty() {
            return;
        }

        // Stable, so equal keys keep their insertion order.
        self.unprocessed.sort_by_key(Centroid::sort_key);

        let total_weight = self.processed_weight + self.unprocessed_weight;
        let scaler = self.scaler.normalized(total_weight);
        compress_into(
            &self.processed,
            &self.unprocessed,
            total_weight,
            &scaler,
            &mut self.scratch,
        );
        trace!(
            processed = self.processed.len(),
            unprocessed = self.unprocessed.len(),
            centroids = self.scratch.len(),
            total_weight,
            "Compressed digest."
        );

        std::mem::swap(&mut self.processed, &mut self.scratch);
        self.scratch.clear();
        self.unprocessed.clear();
        self.unprocessed_weight = 0.0;

        if let (Some(first), Some(last)) = (self.processed.first(), self.processed.last()) {
            self.min = self.min.min(first.mean);
            self.max = self.max.max(last.mean);
        }
        self.update_cumulative();
    }

    fn update_cumulative(&mut self) {
        self.offsets.clear();
        self.cumulative.clear();
        let mut so_far = 0.0;
        for centroid in &self.processed {
            self.offsets.push(so_far);
            self.cumulative.push(so_far + centroid.weight / 2.0);
            so_far += centroid.weight;
        }
        self.processed_weight = so_far;
    }

    /// Returns an estimate for
    /// [quantile](https://en.wikipedia.org/wiki/Quantile) `q` where `0.0 <= q
    /// <= 1.0`.
    ///
    /// For example:
    ///   - `q=0.0` returns the _minimum_
    ///   - `q=0.5` returns the _median_
    ///   - `q=1.0` returns the _maximum_
    pub fn quantile(&mut self, q: f64) -> Result<f64, TDigestError> {
        ensure!((0.0..=1.0).contains(&q), InvalidQuerySnafu { value: q });
        self.flush();

        let (first, last) = match (self.processed.first(), self.processed.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return EmptySketchSnafu.fail(),
        };
        if q == 0.0 {
            return Ok(self.min);
        }
        if q == 1.0 {
            return Ok(self.max);
        }
        let n = self.processed.len();
        if n == 1 {
            return Ok(first.mean);
        }

        let total = self.processed_weight;
        let target = q * total;
        let first_mid = self.cumulative[0];
        let last_mid = self.cumulative[n - 1];

        let value = if target < first_mid {
            if first.is_singleton() {
                first.mean
            } else {
                interpolate(target, (0.0, self.min), (first_mid, first.mean))
            }
        } else if target > last_mid {
            if last.is_singleton() {
                last.mean
            } else {
                interpolate(target, (last_mid, last.mean), (total, self.max))
            }
        } else {
            // Bracket so that cumulative[i] <= target <= cumulative[i + 1].
            let i = self
                .cumulative
                .partition_point(|&mid| mid <= target)
                .saturating_sub(1)
                .min(n - 2);
            interpolate(
                target,
                (self.cumulative[i], self.processed[i].mean),
                (self.cumulative[i + 1], self.processed[i + 1].mean),
            )
        };
        Ok(value.max(self.min).min(self.max))
    }

    /// Returns an estimate of the fraction of observations less than or equal
    /// to `x`.
    ///
    /// Unit-weight centroids are treated as exact observations: the estimate
    /// steps by their weight at their mean instead of ramping across them.
    pub fn cdf(&mut self, x: f64) -> Result<f64, TDigestError> {
        ensure!(!x.is_nan(), InvalidQuerySnafu { value: x });
        self.flush();
        ensure!(!self.processed.is_empty(), EmptySketchSnafu);

        if x >= self.max {
            return Ok(1.0);
        }
        if x <= self.min {
            return Ok(0.0);
        }
        let n = self.processed.len();
        if n == 1 {
            return Ok(interpolate(x, (self.min, 0.0), (self.max, 1.0)));
        }

        let total = self.processed_weight;
        let lower = self.processed.partition_point(|c| c.mean < x);
        let upper = lower + self.processed[lower..].partition_point(|c| c.mean <= x);

        let rank = if lower < upper {
            // Exact hit on one or more centroids: take the middle of their mass.
            let before = self.offsets[lower];
            let run = self.offsets[upper - 1] + self.processed[upper - 1].weight - before;
            before + run / 2.0
        } else if upper == 0 {
            let first = self.processed[0];
            let end = if first.is_singleton() { 0.0 } else { first.weight / 2.0 };
            interpolate(x, (self.min, 0.0), (first.mean, end))
        } else if upper == n {
            let last = self.processed[n - 1];
            let start = if last.is_singleton() { total } else { self.cumulative[n - 1] };
            interpolate(x, (last.mean, start), (self.max, total))
        } else {
            let (l, r) = (upper - 1, upper);
            let base = if self.processed[l].is_singleton() {
                self.offsets[l] + self.processed[l].weight
            } else {
                self.cumulative[l]
            };
            let end = if self.processed[r].is_singleton() {
                self.offsets[r]
            } else {
                self.cumulative[r]
            };
            interpolate(x, (self.processed[l].mean, base), (self.processed[r].mean, end))
        };
        Ok((rank / total).clamp(0.0, 1.0))
    }
}

/// Linear interpolation through `(x0, y0)` and `(x1, y1)`, kept within `[y0, y1]`.
#[inline]
fn interpolate(x: f64, (x0, y0): (f64, f64), (x1, y1): (f64, f64)) -> f64 {
    let width = x1 - x0;
    let t = if width.is_finite() {
        (x - x0) / width
    } else {
        (x * 0.5 - x0 * 0.5) / (x1 * 0.5 - x0 * 0.5)
    };
    let span = y1 - y0;
    let value = if span.is_finite() {
        y0 + span * t
    } else {
        y0 * (1.0 - t) + y1 * t
    };
    value.max(y0).min(y1)
}
