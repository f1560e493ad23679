use crate::{centroid::Centroid, scale::Scaler};
use std::iter::Peekable;

/// Merges two runs that are each sorted by mean into one sorted stream.
///
/// On equal means the left run wins, which keeps the merge stable.
struct MergeByMean<'a> {
    left: Peekable<std::slice::Iter<'a, Centroid>>,
    right: Peekable<std::slice::Iter<'a, Centroid>>,
}

impl<'a> MergeByMean<'a> {
    fn new(left: &'a [Centroid], right: &'a [Centroid]) -> Self {
        Self {
            left: left.iter().peekable(),
            right: right.iter().peekable(),
        }
    }
}

impl Iterator for MergeByMean<'_> {
    type Item = Centroid;

    fn next(&mut self) -> Option<Self::Item> {
        let take_left = match (self.left.peek(), self.right.peek()) {
            (Some(l), Some(r)) => l.mean <= r.mean,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => return None,
        };
        if take_left {
            self.left.next().copied()
        } else {
            self.right.next().copied()
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.left.len() + self.right.len();
        (len, Some(len))
    }
}

impl ExactSizeIterator for MergeByMean<'_> {}

/// Merges `processed` and the already sorted `unprocessed` run into `out`,
/// collapsing neighbours while they fit under the scale function's limit.
///
/// The first and last centroids of the merged stream are always emitted on
/// their own so the extremes of the distribution keep their resolution.
pub(crate) fn compress_into(
    processed: &[Centroid],
    unprocessed: &[Centroid],
    total_weight: f64,
    scaler: &Scaler,
    out: &mut Vec<Centroid>,
) {
    out.clear();
    let mut stream = MergeByMean::new(processed, unprocessed);
    let last = stream.len().saturating_sub(1);

    let Some(first) = stream.next() else {
        return;
    };
    out.push(first);

    let mut weight_so_far = first.weight;
    let mut q_limit = 0.0;
    let mut open: Option<Centroid> = None;
    for (index, centroid) in (1..).zip(stream) {
        match open.as_mut() {
            Some(current)
                if index != last
                    && (weight_so_far + current.weight + centroid.weight) / total_weight <= q_limit =>
            {
                *current += centroid;
            }
            _ => {
                if let Some(closed) = open.take() {
                    weight_so_far += closed.weight;
                    out.push(closed);
                }
                q_limit = scaler.q_limit(weight_so_far / total_weight);
                open = Some(centroid);
            }
        }
    }
    if let Some(closed) = open {
        out.push(closed);
    }

    // Absorption can drift a mean past its neighbour by an ulp.
    out.sort_by_key(Centroid::sort_key);
}
