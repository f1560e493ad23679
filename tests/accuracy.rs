//! End-to-end accuracy checks against known distributions.

use rand::{rngs::SmallRng, Rng as _, SeedableRng};
use rand_distr::{Distribution, Exp, Normal};
use tdigest::{ScaleFunction, TDigest, TDigestConfig};

const SEED: u64 = 0xC0FFEE;
const SAMPLES: usize = 100_000;
const REPORTED_QUANTILES: [f64; 7] = [0.1, 0.2, 0.5, 0.75, 0.9, 0.99, 0.999];

fn uniform_samples(n: usize) -> Vec<f64> {
    let mut rng = SmallRng::seed_from_u64(SEED);
    (0..n).map(|_| rng.random::<f64>()).collect()
}

fn normal_samples(n: usize) -> Vec<f64> {
    let distribution = Normal::new(0.0, 1.0).expect("normal distribution should be valid");
    let mut rng = SmallRng::seed_from_u64(SEED);
    // Antithetic pairs keep the sample symmetric around zero.
    distribution
        .sample_iter(&mut rng)
        .take(n / 2)
        .flat_map(|z| [z, -z])
        .collect()
}

fn exponential_samples(n: usize) -> Vec<f64> {
    let distribution = Exp::new(1.0).expect("exponential distribution should be valid");
    let rng = SmallRng::seed_from_u64(SEED);
    distribution.sample_iter(rng).take(n).collect()
}

fn digest_of(compression: f64, values: &[f64]) -> TDigest {
    let mut digest = TDigest::new(compression).expect("compression should be valid");
    for &value in values {
        digest.insert(value).expect("samples should be finite");
    }
    digest
}

fn assert_within(value: f64, low: f64, high: f64, what: &str) {
    assert!(
        (low..=high).contains(&value),
        "{}: {} not in [{}, {}]",
        what,
        value,
        low,
        high
    );
}

#[test]
fn uniform_100k_compression_100() {
    let mut t = digest_of(100.0, &uniform_samples(SAMPLES));

    assert_eq!(t.count(), SAMPLES as f64);
    assert_within(t.quantile(0.5).unwrap(), 0.49, 0.51, "p50");
    assert_within(t.quantile(0.99).unwrap(), 0.985, 0.995, "p99");
    assert_within(t.quantile(0.999).unwrap(), 0.9985, 0.9995, "p99.9");
    assert!(t.centroid_count() <= 200);
}

#[test]
fn normal_100k_compression_1000() {
    let mut t = digest_of(1000.0, &normal_samples(SAMPLES));

    assert!(t.quantile(0.5).unwrap().abs() < 0.01);
    assert!((t.quantile(0.9).unwrap() - 1.2816).abs() < 0.02);
    assert!((t.quantile(0.999).unwrap() - 3.0902).abs() < 0.1);
    assert!(t.centroid_count() <= 2000);
}

#[test]
fn exponential_heavy_tail() {
    let mut t = digest_of(100.0, &exponential_samples(SAMPLES));
    let p99 = t.quantile(0.99).unwrap();
    assert!((p99 - 100f64.ln()).abs() < 0.2, "p99 {}", p99);
}

#[test]
fn k2_scale_tracks_the_tails() {
    let config = TDigestConfig::default().with_scale(ScaleFunction::K2);
    let mut t = TDigest::with_config(config).unwrap();
    t.add_many(&uniform_samples(SAMPLES)).unwrap();

    assert_within(t.quantile(0.5).unwrap(), 0.49, 0.51, "p50");
    assert_within(t.quantile(0.999).unwrap(), 0.9985, 0.9995, "p99.9");
    assert_within(t.quantile(0.001).unwrap(), 0.0005, 0.0015, "p0.1");
}

#[test]
fn reported_quantiles_are_ordered_and_bounded() {
    let samples = normal_samples(SAMPLES);
    let mut t = digest_of(1000.0, &samples);
    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let reported: Vec<_> = REPORTED_QUANTILES.iter().map(|&q| t.quantile(q).unwrap()).collect();
    assert!(reported.windows(2).all(|w| w[0] <= w[1]), "{:?}", reported);
    assert!(reported.iter().all(|v| (min..=max).contains(v)));
    assert_eq!(t.quantile(0.0).unwrap(), min);
    assert_eq!(t.quantile(1.0).unwrap(), max);
}

#[test]
fn cdf_tracks_the_distribution() {
    let mut t = digest_of(100.0, &uniform_samples(SAMPLES));
    for x in [0.01, 0.1, 0.25, 0.5, 0.75, 0.9, 0.99] {
        let rank = t.cdf(x).unwrap();
        assert!((rank - x).abs() < 0.01, "cdf({}) = {}", x, rank);
    }
    assert_eq!(t.cdf(-1.0).unwrap(), 0.0);
    assert_eq!(t.cdf(2.0).unwrap(), 1.0);
}

#[test]
fn per_thread_digests_merge_like_one() {
    let samples = uniform_samples(SAMPLES);
    let mut single = digest_of(100.0, &samples);

    let parts: Vec<TDigest> = std::thread::scope(|scope| {
        let handles: Vec<_> = samples
            .chunks(SAMPLES / 4)
            .map(|chunk| scope.spawn(move || digest_of(100.0, chunk)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("worker should not panic"))
            .collect()
    });

    let mut merged = TDigest::default();
    for part in &parts {
        merged.merge(part);
    }
    assert_eq!(merged.count(), single.count());
    assert_eq!(merged.min(), single.min());
    assert_eq!(merged.max(), single.max());

    for q in REPORTED_QUANTILES {
        let a = merged.quantile(q).unwrap();
        let b = single.quantile(q).unwrap();
        assert!((a - b).abs() < 0.01, "q={} merged={} single={}", q, a, b);
    }
}

#[test]
fn merge_is_statistically_commutative() {
    let samples = normal_samples(SAMPLES);
    let (left, right) = samples.split_at(SAMPLES / 3);
    let a = digest_of(200.0, left);
    let b = digest_of(200.0, right);

    let mut ab = a.clone();
    ab.merge(&b);
    let mut ba = b.clone();
    ba.merge(&a);

    assert_eq!(ab.count(), ba.count());
    for q in REPORTED_QUANTILES {
        let x = ab.quantile(q).unwrap();
        let y = ba.quantile(q).unwrap();
        assert!((x - y).abs() < 0.05, "q={} ab={} ba={}", q, x, y);
    }
}
