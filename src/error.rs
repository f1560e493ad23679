use snafu::Snafu;

/// Errors returned by [`TDigest`](crate::TDigest) operations.
///
/// Every error is raised before the digest is modified, so a failed call leaves
/// the digest exactly as it was.
#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TDigestError {
    /// The configuration is outside of its permitted range.
    #[snafu(display("Invalid configuration: {}", reason))]
    InvalidConfig { reason: String },

    /// A value was NaN or infinite, or its weight was not a positive finite number.
    #[snafu(display("Invalid observation: value {} with weight {}.", value, weight))]
    InvalidValue { value: f64, weight: f64 },

    /// A quantile outside of `[0, 1]`, or a NaN CDF argument.
    #[snafu(display("Invalid query argument {}.", value))]
    InvalidQuery { value: f64 },

    /// The digest has no observations to answer a query from.
    #[snafu(display("Cannot query an empty digest."))]
    EmptySketch,
}

/// Errors returned when decoding a persisted [`TDigest`](crate::TDigest).
#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DecodeError {
    #[snafu(display("Truncated input while reading {}: needed {} bytes, {} remaining.", field, needed, remaining))]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    #[snafu(display("Invalid header magic value {:#06x}.", found))]
    InvalidMagic { found: u16 },

    #[snafu(display("Unsupported encoding version {}.", found))]
    UnsupportedVersion { found: u32 },

    #[snafu(display("Unknown scale function tag {}.", found))]
    UnknownScale { found: u8 },

    #[snafu(display("Encoded configuration is invalid: {}", source))]
    InvalidEncodedConfig { source: TDigestError },

    #[snafu(display("Too many centroids: {} exceeds the limit of {}.", count, limit))]
    TooManyCentroids { count: u32, limit: u32 },

    #[snafu(display("Data corruption detected: {}", reason))]
    Corrupted { reason: String },

    #[snafu(display("Found {} unexpected bytes trailing the digest.", count))]
    TrailingBytes { count: usize },
}
