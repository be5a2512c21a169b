//! Row windows over a single loan's ordered history

/// Number of preceding statuses kept as the evidence trail
pub const TRAILING_ROWS: usize = 12;

/// Short forward horizon, in rows
pub const FORWARD_SHORT: usize = 12;

/// Long forward horizon, in rows
pub const FORWARD_LONG: usize = 24;

/// Value of the immediately preceding row
pub fn lag<T: Clone>(values: &[T], i: usize) -> Option<T> {
    i.checked_sub(1).and_then(|prev| values.get(prev)).cloned()
}

/// Up to `n` rows strictly before `i`, oldest first
pub fn trailing<T>(values: &[T], i: usize, n: usize) -> &[T] {
    let end = i.min(values.len());
    &values[end.saturating_sub(n)..end]
}

/// Up to `n` rows strictly after `i`
pub fn forward<T>(values: &[T], i: usize, n: usize) -> &[T] {
    let start = (i + 1).min(values.len());
    let end = (i + 1 + n).min(values.len());
    &values[start..end]
}

/// Largest value in the `n` rows after `i`.
///
/// Near the end of the history the window shrinks to the rows that remain;
/// only the last row, with nothing after it, yields `None`.
pub fn forward_max<T: Ord + Clone>(values: &[T], i: usize, n: usize) -> Option<T> {
    forward(values, i, n).iter().max().cloned()
}

/// Largest reported value in the `n` rows after `i`, skipping gaps
pub fn forward_max_present<T: Ord + Clone>(values: &[Option<T>], i: usize, n: usize) -> Option<T> {
    forward(values, i, n).iter().flatten().max().cloned()
}
