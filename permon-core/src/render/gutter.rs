//! Contributor gutter on the right side of a chart

use std::cmp::Ordering;

use super::glyphs::{RIGHT_AXIS, VERTICAL};
use crate::sample::Contributor;

const ELLIPSIS: &str = "...";

/// Truncate `label` to `max_len` characters, marking the cut with `...`.
pub fn format_contributor_label(label: &str, max_len: usize) -> String {
    if label.chars().count() <= max_len {
        return label.to_string();
    }
    let keep = max_len.saturating_sub(ELLIPSIS.len());
    if keep == 0 {
        return label.chars().take(max_len).collect();
    }
    let mut out: String = label.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Distribute exactly `target` rows over fractional `shares`.
///
/// Every entry first gets the floor of its share. A shortfall is awarded one
/// row at a time by largest fractional remainder (ties go to the earlier
/// entry); an excess is taken from the last entries first.
pub fn apportion_rows(shares: &[f64], target: usize) -> Vec<usize> {
    if shares.is_empty() {
        return Vec::new();
    }

    let shares: Vec<f64> = shares
        .iter()
        .map(|s| if s.is_finite() { s.max(0.0) } else { 0.0 })
        .collect();
    let mut rows: Vec<usize> = shares.iter().map(|s| s.floor() as usize).collect();
    let used: usize = rows.iter().sum();

    match used.cmp(&target) {
        Ordering::Less => {
            let mut order: Vec<usize> = (0..shares.len()).collect();
            order.sort_by(|&a, &b| {
                shares[b]
                    .fract()
                    .partial_cmp(&shares[a].fract())
                    .unwrap_or(Ordering::Equal)
                    .then(a.cmp(&b))
            });
            for &i in order.iter().cycle().take(target - used) {
                rows[i] += 1;
            }
        }
        Ordering::Greater => {
            let mut left = target;
            for r in rows.iter_mut() {
                *r = (*r).min(left);
                left -= *r;
            }
        }
        Ordering::Equal => {}
    }
    rows
}

/// Build the gutter column, top line first, `lines` entries each padded to
/// `width` characters.
///
/// Contributors are stacked bottom-up in list order, each as a vertical run
/// topped by a tick with its label next to the middle of the run.
pub(crate) fn build_gutter(
    contributors: &[Contributor],
    maximum: f64,
    lines: usize,
    target: usize,
    width: usize,
) -> Vec<String> {
    let rows = lines.saturating_sub(1) as f64;
    let shares: Vec<f64> = contributors
        .iter()
        .map(|c| c.value / maximum * rows)
        .collect();
    let counts = apportion_rows(&shares, target.min(lines));
    let max_label_len = width.saturating_sub(2);

    let mut column: Vec<String> = Vec::with_capacity(lines);
    for (contributor, &n) in contributors.iter().zip(&counts) {
        if n == 0 {
            continue;
        }
        column.extend(std::iter::repeat(VERTICAL.to_string()).take(n - 1));
        column.push(RIGHT_AXIS.to_string());

        let mid = column.len() - n / 2 - 1;
        column[mid].push(' ');
        column[mid].push_str(&format_contributor_label(&contributor.name, max_label_len));
    }

    column.truncate(lines);
    let unused = lines - column.len();
    column.extend(std::iter::repeat(VERTICAL.to_string()).take(unused));

    column
        .into_iter()
        .rev()
        .map(|cell| {
            let pad = width.saturating_sub(cell.chars().count());
            let mut cell = cell;
            cell.extend(std::iter::repeat(' ').take(pad));
            cell
        })
        .collect()
}
