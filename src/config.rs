use crate::{error::*, scale::ScaleFunction};
use snafu::ensure;

/// Smallest accepted compression.
pub const MIN_COMPRESSION: f64 = 20.0;

/// Largest accepted compression.
pub const MAX_COMPRESSION: f64 = 10_000.0;

/// Compression used by [`TDigestConfig::default`].
pub const DEFAULT_COMPRESSION: f64 = 100.0;

const MIN_BUFFER_MULTIPLIER: usize = 5;
const MAX_BUFFER_MULTIPLIER: usize = 20;
const DEFAULT_BUFFER_MULTIPLIER: usize = 8;
const MIN_BUFFER_CAPACITY: usize = 100;

/// Configuration of a [`TDigest`](crate::TDigest).
///
/// `compression` trades memory for accuracy: the number of centroids kept is
/// proportional to it. `buffer_multiplier` sizes the staging buffer of raw
/// observations, which holds `compression * buffer_multiplier` entries before a
/// compression is forced.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TDigestConfig {
    pub(crate) compression: f64,
    pub(crate) buffer_multiplier: usize,
    pub(crate) scale: ScaleFunction,
}

impl Default for TDigestConfig {
    fn default() -> Self {
        Self {
            compression: DEFAULT_COMPRESSION,
            buffer_multiplier: DEFAULT_BUFFER_MULTIPLIER,
            scale: ScaleFunction::default(),
        }
    }
}

impl TDigestConfig {
    pub fn with_compression(mut self, compression: f64) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_buffer_multiplier(mut self, buffer_multiplier: usize) -> Self {
        self.buffer_multiplier = buffer_multiplier;
        self
    }

    pub fn with_scale(mut self, scale: ScaleFunction) -> Self {
        self.scale = scale;
        self
    }

    #[inline]
    pub fn compression(&self) -> f64 {
        self.compression
    }

    #[inline]
    pub fn buffer_multiplier(&self) -> usize {
        self.buffer_multiplier
    }

    #[inline]
    pub fn scale(&self) -> ScaleFunction {
        self.scale
    }

    /// Checks that every parameter is within its permitted range.
    pub fn validate(&self) -> Result<(), TDigestError> {
        // `contains` is false for NaN.
        ensure!(
            (MIN_COMPRESSION..=MAX_COMPRESSION).contains(&self.compression),
            InvalidConfigSnafu {
                reason: format!(
                    "compression must be between {} and {} inclusive, got {}",
                    MIN_COMPRESSION, MAX_COMPRESSION, self.compression
                ),
            }
        );
        ensure!(
            (MIN_BUFFER_MULTIPLIER..=MAX_BUFFER_MULTIPLIER).contains(&self.buffer_multiplier),
            InvalidConfigSnafu {
                reason: format!(
                    "buffer multiplier must be between {} and {} inclusive, got {}",
                    MIN_BUFFER_MULTIPLIER, MAX_BUFFER_MULTIPLIER, self.buffer_multiplier
                ),
            }
        );
        Ok(())
    }

    /// Number of staged observations that triggers a compression.
    pub(crate) fn buffer_capacity(&self) -> usize {
        let capacity = (self.compression * self.buffer_multiplier as f64).ceil() as usize;
        capacity.max(MIN_BUFFER_CAPACITY)
    }

    /// Upper bound on the number of processed centroids.
    pub(crate) fn max_centroids(&self) -> usize {
        2 * self.compression.ceil() as usize
    }
}
