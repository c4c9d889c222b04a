//! Axis bounds and row quantization

use crate::history::min_max;
use crate::sample::Bounds;

/// Fill in unknown bounds from the buffered values.
///
/// A constant buffer gets `value ± 1` so the chart never collapses to a
/// zero-height interval. The result always satisfies `maximum > minimum`.
pub fn resolve_bounds(bounds: Bounds, values: &[f64]) -> (f64, f64) {
    let observed = min_max(values.iter().copied().filter(|v| v.is_finite()));
    let (lo, hi) = match observed {
        Some((lo, hi)) if hi > lo => (lo, hi),
        Some((v, _)) => (v - 1.0, v + 1.0),
        None => (-1.0, 1.0),
    };

    let mut minimum = bounds.minimum.unwrap_or(lo);
    let mut maximum = bounds.maximum.unwrap_or(hi);
    if maximum <= minimum {
        match (bounds.minimum, bounds.maximum) {
            (_, None) => maximum = minimum + 1.0,
            (None, Some(_)) => minimum = maximum - 1.0,
            (Some(_), Some(_)) => {}
        }
    }
    (minimum, maximum)
}

fn round4(value: f64) -> f64 {
    (value * 1e4).round() / 1e4
}

/// Mapping from values to integer chart rows for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub minimum: f64,
    pub maximum: f64,
    ratio: f64,
    min_cell: i64,
    /// Set when `rows` was clamped; cells are then measured from `minimum`.
    anchored: bool,
    /// Index of the top row; the chart has `rows + 1` lines
    pub rows: usize,
}

impl Scale {
    /// `height` is the number of lines available for the plot.
    pub fn new(minimum: f64, maximum: f64, height: usize) -> Self {
        let interval = (maximum - minimum).abs();
        let max_rows = height.saturating_sub(1).max(1);
        let ratio = if interval > 0.0 {
            max_rows as f64 / interval
        } else {
            1.0
        };

        // Rounding first keeps float noise from adding a row.
        let min_cell = round4(minimum * ratio).floor() as i64;
        let max_cell = round4(maximum * ratio).ceil() as i64;
        let span = (max_cell - min_cell).unsigned_abs() as usize;
        let rows = span.clamp(1, max_rows);

        // A clamped span no longer sits on whole rows: anchor the minimum
        // at row 0 so values line up with their labels.
        let anchored = span != rows;
        let ratio = if anchored {
            rows as f64 / interval
        } else {
            ratio
        };

        Self {
            minimum,
            maximum,
            ratio,
            min_cell,
            anchored,
            rows,
        }
    }

    /// Row index of `value`, 0 at the bottom, clamped to `[0, rows]`.
    pub fn cell(&self, value: f64) -> usize {
        let raw = if self.anchored {
            ((value - self.minimum) * self.ratio).round()
        } else {
            (value * self.ratio).round() - self.min_cell as f64
        };
        raw.clamp(0.0, self.rows as f64) as usize
    }

    /// `rows + 1` label values, top to bottom
    pub fn label_values(&self) -> Vec<f64> {
        let interval = (self.maximum - self.minimum).abs();
        (0..=self.rows)
            .map(|y| self.maximum - y as f64 * interval / self.rows as f64)
            .collect()
    }
}

/// Format axis labels with a precision chosen by the magnitude of the
/// largest label, so every label of one axis has the same shape.
pub fn format_labels(values: &[f64]) -> Vec<String> {
    let Some(largest) = values.iter().copied().reduce(f64::max) else {
        return Vec::new();
    };
    let magnitude = largest.abs();

    values
        .iter()
        .map(|&x| {
            if magnitude <= 10.0 {
                format!("{x:.3}")
            } else if magnitude <= 100.0 {
                format!("{x:.2}")
            } else if magnitude <= 1000.0 {
                format!("{x:.1}")
            } else if magnitude <= 10000.0 {
                truncate_to_step(x, 50.0)
            } else {
                truncate_to_step(x, 100.0)
            }
        })
        .collect()
}

/// `x` truncated toward zero to a multiple of `step`, without a decimal part.
/// Stays in f64 so huge labels come out long instead of overflowing.
fn truncate_to_step(x: f64, step: f64) -> String {
    // Adding 0.0 turns -0 into 0.
    format!("{:.0}", (x / step).trunc() * step + 0.0)
}
