//! Contributor apportionment
//!
//! Rescales a raw per-contributor table so it sums to the metric's actual
//! value and cuts it down to a bounded top-N list with an "other" bucket.

use std::cmp::Ordering;

use crate::sample::Contributor;

/// Name of the bucket that collects everything outside the top-N
pub const OTHER: &str = "other";

/// Default number of entries returned, "other" included
pub const DEFAULT_TOP_N: usize = 5;

const EPSILON: f64 = 1e-9;

/// Build the visible contributor list for a metric.
///
/// Entries are sorted descending and zero-valued ones dropped. With
/// `adapt_to`, every value is scaled so the table sums to `adapt_to`, the top
/// `n - 1` entries are kept and the remainder is prepended as [`OTHER`], so
/// the returned `n` entries sum to exactly `adapt_to`. Without it, the top
/// `n` raw entries are returned unchanged.
pub fn top_contributors<I, S>(raw: I, n: usize, adapt_to: Option<f64>) -> Vec<Contributor>
where
    I: IntoIterator<Item = (S, f64)>,
    S: Into<String>,
{
    if n == 0 {
        return Vec::new();
    }

    let mut entries: Vec<Contributor> = raw
        .into_iter()
        .filter(|(_, value)| value.is_finite() && *value > 0.0)
        .map(|(name, value)| Contributor::new(name, value))
        .collect();
    // Ties broken by name so output does not depend on map iteration order.
    entries.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });

    let Some(target) = adapt_to else {
        entries.truncate(n);
        return entries;
    };

    let raw_sum: f64 = entries.iter().map(|c| c.value).sum();
    let scale = target / raw_sum.max(EPSILON);
    for entry in &mut entries {
        entry.value *= scale;
    }

    entries.truncate(n - 1);
    let top_sum: f64 = entries.iter().map(|c| c.value).sum();
    entries.insert(0, Contributor::new(OTHER, target - top_sum));
    entries
}
