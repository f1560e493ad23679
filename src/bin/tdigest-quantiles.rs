//! Reads whitespace-separated observations from each input file, feeds them to a t-digest and writes the estimated
//! quantiles next to the input as `<value> <q>` lines.

use std::{fs, path::PathBuf};

use anyhow::{Context as _, Result};
use clap::Parser;
use tdigest::{TDigest, TDigestConfig};
use tracing::{error, info};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

const DEFAULT_QUANTILES: [f64; 7] = [0.1, 0.2, 0.5, 0.75, 0.9, 0.99, 0.999];

#[derive(Clone, Debug, Parser)]
#[command(about)]
struct Cli {
    /// Files of whitespace-separated decimal numbers, one observation each.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Compression of the digest.
    #[arg(long, default_value_t = 1000.0)]
    compression: f64,

    /// Quantiles to report, in output order.
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_QUANTILES)]
    quantiles: Vec<f64>,

    /// Suffix appended to each input path to name its output file.
    #[arg(long, default_value = ".rs.quantiles")]
    suffix: String,
}

fn main() {
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        error!("{:?}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = TDigestConfig::default().with_compression(cli.compression);
    for input in &cli.inputs {
        let raw = fs::read_to_string(input).with_context(|| format!("Failed to read {}.", input.display()))?;
        let values = parse_observations(&raw).with_context(|| format!("Failed to parse {}.", input.display()))?;

        let mut digest = TDigest::with_config(config)?;
        digest.add_many(&values)?;
        let report = render_report(&mut digest, &cli.quantiles)?;

        let mut output = input.clone().into_os_string();
        output.push(&cli.suffix);
        let output = PathBuf::from(output);
        fs::write(&output, report).with_context(|| format!("Failed to write {}.", output.display()))?;

        let centroids = digest.centroid_count();
        info!(
            input = %input.display(),
            output = %output.display(),
            observations = values.len(),
            centroids,
            "Wrote quantiles."
        );
    }
    Ok(())
}

fn parse_observations(raw: &str) -> Result<Vec<f64>> {
    raw.split_whitespace()
        .enumerate()
        .map(|(i, token)| {
            token
                .parse::<f64>()
                .with_context(|| format!("Observation {} ({:?}) is not a number.", i, token))
        })
        .collect()
}

fn render_report(digest: &mut TDigest, quantiles: &[f64]) -> Result<String> {
    let mut report = String::new();
    for &q in quantiles {
        let value = digest.quantile(q)?;
        // `Display` for f64 prints the shortest representation that round-trips.
        report.push_str(&format!("{} {}\n", value, q));
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whitespace_separated_values() {
        let values = parse_observations("1.5 2\n-3e2\t\n 4.25\n").unwrap();
        assert_eq!(values, vec![1.5, 2.0, -300.0, 4.25]);
        assert!(parse_observations("").unwrap().is_empty());
        assert!(parse_observations("1.0 abc").is_err());
    }

    #[test]
    fn renders_one_line_per_quantile() {
        let mut digest = TDigest::new(1000.0).unwrap();
        digest.add_many(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let report = render_report(&mut digest, &[0.5, 1.0]).unwrap();
        assert_eq!(report, "3 0.5\n5 1\n");
    }

    #[test]
    fn empty_input_is_an_error() {
        let mut digest = TDigest::default();
        assert!(render_report(&mut digest, &DEFAULT_QUANTILES).is_err());
    }
}
