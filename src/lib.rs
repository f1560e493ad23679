//! Streaming T-Digest in Rust
//!
//! A data structure for approximating the [quantile
//! function](https://en.wikipedia.org/wiki/Quantile_function) of a sample
//! distribution from an unbounded stream of observations. T-digests have
//! bounded memory requirements and are most accurate near the tails, making
//! them useful for latency percentiles and other streaming data analysis.
//!
//! [t-digest
//! paper](https://github.com/tdunning/t-digest/blob/main/docs/t-digest-paper/histo.pdf)
//!
//! ## Example
//!
//! ```rust
//! use tdigest::TDigest;
//!
//! let mut t = TDigest::new(100.0).unwrap();
//! for i in 1..=1_000_000 {
//!     t.insert(f64::from(i)).unwrap();
//! }
//!
//! let ans = t.quantile(0.99).unwrap();
//! let expected: f64 = 990_000.0;
//!
//! let percentage: f64 = (expected - ans).abs() / expected;
//! assert!(percentage < 0.01);
//!
//! let rank = t.cdf(500_000.0).unwrap();
//! assert!((rank - 0.5).abs() < 0.01);
//! ```
//!
//! ## Merging
//!
//! Digests built independently, for example one per thread, can be combined:
//!
//! ```rust
//! use tdigest::TDigest;
//!
//! let mut a = TDigest::default();
//! let mut b = TDigest::default();
//! a.add_many(&[1.0, 2.0, 3.0]).unwrap();
//! b.add_many(&[4.0, 5.0]).unwrap();
//!
//! a.merge(&b);
//! assert_eq!(a.count(), 5.0);
//! assert_eq!(a.quantile(1.0).unwrap(), 5.0);
//! ```

mod centroid;
mod codec;
mod compressor;
mod config;
mod error;
mod scale;
mod t_digest;

pub use centroid::*;
pub use config::{TDigestConfig, DEFAULT_COMPRESSION, MAX_COMPRESSION, MIN_COMPRESSION};
pub use error::{DecodeError, TDigestError};
pub use scale::ScaleFunction;
pub use t_digest::*;
