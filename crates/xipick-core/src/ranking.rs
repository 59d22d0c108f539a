// Stable descending leaderboards.

use serde::Serialize;
use std::cmp::Ordering;

/// One leaderboard row. `rank` is 1-based position in the sorted output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry<V> {
    pub rank: usize,
    pub name: String,
    pub value: V,
}

/// Descending order with NaN after every real number.
fn descending(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

fn number<V>(items: Vec<(String, V)>) -> Vec<RankedEntry<V>> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, (name, value))| RankedEntry {
            rank: i + 1,
            name,
            value,
        })
        .collect()
}

/// Sort by value, highest first. Equal values keep their input order.
pub fn rank_descending<I>(items: I) -> Vec<RankedEntry<f64>>
where
    I: IntoIterator<Item = (String, f64)>,
{
    let mut items: Vec<(String, f64)> = items.into_iter().collect();
    // `sort_by` is stable.
    items.sort_by(|a, b| descending(a.1, b.1));
    number(items)
}

/// Like [`rank_descending`], but entries without a value go after every
/// valued entry, still in input order.
pub fn rank_optional<I>(items: I) -> Vec<RankedEntry<Option<f64>>>
where
    I: IntoIterator<Item = (String, Option<f64>)>,
{
    let mut items: Vec<(String, Option<f64>)> = items.into_iter().collect();
    items.sort_by(|a, b| match (a.1, b.1) {
        (Some(x), Some(y)) => descending(x, y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    number(items)
}

/// Rank a pooled set of entries and keep the best `n`.
pub fn pick_top<I>(pooled: I, n: usize) -> Vec<RankedEntry<f64>>
where
    I: IntoIterator<Item = (String, f64)>,
{
    let mut ranked = rank_descending(pooled);
    ranked.truncate(n);
    ranked
}
