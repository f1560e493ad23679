//! Binary persistence for [`TDigest`].
//!
//! All values are little-endian:
//!
//! ```text
//! magic:u16 version:u32 compression:f64 buffer_multiplier:u32 scale:u8
//! min:f64 max:f64 sum:f64 n:u32 (mean:f64 weight:f64) * n
//! ```
//!
//! The layout is not promised to stay stable across crate versions.

use crate::{centroid::Centroid, config::TDigestConfig, error::*, scale::ScaleFunction, t_digest::TDigest};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use snafu::{ensure, OptionExt as _, ResultExt as _};
use tracing::debug;
use unsigned_varint::encode as varint_encode;

const MAGIC: u16 = 0x0c80;
const ENCODING_VERSION: u32 = 1;
const MAX_ENCODED_CENTROIDS: u32 = 1 << 20;

const HEADER_LEN: usize = 2 + 4 + 8 + 4 + 1 + 8 + 8 + 8 + 4;
const CENTROID_LEN: usize = 8 + 8;

impl TDigest {
    /// Writes the compressed state of this digest to `buf`.
    ///
    /// Pending observations are flushed first.
    pub fn encode<B: BufMut>(&mut self, buf: &mut B) {
        let config = *self.config();
        let (min, max, sum) = (self.min(), self.max(), self.sum());
        let centroids = self.centroids();

        buf.put_u16_le(MAGIC);
        buf.put_u32_le(ENCODING_VERSION);
        buf.put_f64_le(config.compression());
        buf.put_u32_le(config.buffer_multiplier() as u32);
        buf.put_u8(config.scale().tag());
        buf.put_f64_le(min);
        buf.put_f64_le(max);
        buf.put_f64_le(sum);
        buf.put_u32_le(centroids.len() as u32);
        for centroid in centroids {
            buf.put_f64_le(centroid.mean());
            buf.put_f64_le(centroid.weight());
        }
    }

    /// Encodes this digest into a freshly allocated buffer.
    pub fn to_bytes(&mut self) -> Bytes {
        let len = HEADER_LEN + CENTROID_LEN * self.centroid_count();
        let mut buf = BytesMut::with_capacity(len);
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Decodes a digest previously written by [`TDigest::encode`].
    ///
    /// The whole of `buf` must be consumed by the digest.
    pub fn decode<B: Buf>(mut buf: B) -> Result<Self, DecodeError> {
        ensure_remaining(&buf, "header", HEADER_LEN)?;

        let magic = buf.get_u16_le();
        ensure!(magic == MAGIC, InvalidMagicSnafu { found: magic });
        let version = buf.get_u32_le();
        ensure!(version == ENCODING_VERSION, UnsupportedVersionSnafu { found: version });

        let compression = buf.get_f64_le();
        let buffer_multiplier = buf.get_u32_le();
        let tag = buf.get_u8();
        let scale = ScaleFunction::from_tag(tag).context(UnknownScaleSnafu { found: tag })?;
        let config = TDigestConfig::default()
            .with_compression(compression)
            .with_buffer_multiplier(buffer_multiplier as usize)
            .with_scale(scale);
        config.validate().context(InvalidEncodedConfigSnafu)?;

        let min = buf.get_f64_le();
        let max = buf.get_f64_le();
        let sum = buf.get_f64_le();
        let count = buf.get_u32_le();
        ensure!(
            count <= MAX_ENCODED_CENTROIDS,
            TooManyCentroidsSnafu {
                count,
                limit: MAX_ENCODED_CENTROIDS,
            }
        );
        ensure_remaining(&buf, "centroids", CENTROID_LEN * count as usize)?;

        let mut centroids: Vec<Centroid> = Vec::with_capacity(count as usize);
        for i in 0..count as usize {
            let centroid = Centroid::new(buf.get_f64_le(), buf.get_f64_le());
            ensure!(
                centroid.is_valid(),
                CorruptedSnafu {
                    reason: format!(
                        "centroid {} has mean {} and weight {}",
                        i,
                        centroid.mean(),
                        centroid.weight()
                    ),
                }
            );
            if let Some(prev) = centroids.last() {
                ensure!(
                    prev.mean() <= centroid.mean(),
                    CorruptedSnafu {
                        reason: format!(
                            "centroid {} has lower mean ({}) than preceding centroid {} ({})",
                            i,
                            centroid.mean(),
                            i - 1,
                            prev.mean()
                        ),
                    }
                );
            }
            centroids.push(centroid);
        }
        ensure!(!buf.has_remaining(), TrailingBytesSnafu { count: buf.remaining() });

        // `sum` is a derived statistic and may have overflowed for large inputs.
        match (centroids.first(), centroids.last()) {
            (Some(first), Some(last)) => ensure!(
                min.is_finite() && max.is_finite() && min <= first.mean() && last.mean() <= max,
                CorruptedSnafu {
                    reason: format!(
                        "extremes [{}, {}] do not enclose centroid means [{}, {}]",
                        min,
                        max,
                        first.mean(),
                        last.mean()
                    ),
                }
            ),
            _ => {
                ensure!(
                    min == f64::INFINITY && max == f64::NEG_INFINITY,
                    CorruptedSnafu {
                        reason: format!("empty digest carries extremes [{}, {}]", min, max),
                    }
                );
                ensure!(
                    sum == 0.0,
                    CorruptedSnafu {
                        reason: format!("empty digest carries a sum of {}", sum),
                    }
                );
            }
        }

        debug!(centroids = count, compression, "Decoded digest.");
        Ok(TDigest::from_processed(config, centroids, sum, min, max))
    }

    /// Writes the centroids in the state format of ClickHouse's `quantileTDigest`
    /// aggregate: a varint centroid count followed by `(mean, weight)` pairs
    /// as little-endian `f32`s.
    ///
    /// Pending observations are flushed first.
    pub fn export_clickhouse<B: BufMut>(&mut self, buf: &mut B) {
        let centroids = self.centroids();

        let mut scratch = varint_encode::u64_buffer();
        buf.put_slice(varint_encode::u64(centroids.len() as u64, &mut scratch));
        for centroid in centroids {
            buf.put_f32_le(centroid.mean() as f32);
            buf.put_f32_le(centroid.weight() as f32);
        }
    }
}

fn ensure_remaining<B: Buf>(buf: &B, field: &'static str, needed: usize) -> Result<(), DecodeError> {
    let remaining = buf.remaining();
    ensure!(
        remaining >= needed,
        TruncatedSnafu {
            field,
            needed,
            remaining,
        }
    );
    Ok(())
}
