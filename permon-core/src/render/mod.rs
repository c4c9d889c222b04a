//! Character-grid line chart renderer
//!
//! [`GridRenderer::render`] is a pure function of the buffered values, the
//! bounds, the latest contributor breakdown and the resolution. Calling it
//! twice with the same inputs yields the same [`Frame`].

pub mod axis;
pub mod glyphs;
pub mod gutter;

use std::fmt;

use crate::sample::{Bounds, Contributor};
use crate::PermonError;

pub use axis::{format_labels, resolve_bounds, Scale};
pub use gutter::{apportion_rows, format_contributor_label};

/// Smallest usable chart height: one title line plus two plot lines
pub const MIN_ROWS: usize = 3;

/// Size of one chart in terminal cells, title line included
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub rows: usize,
    pub cols: usize,
}

impl Resolution {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }
}

/// One rendered line of a chart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRow {
    /// Right-aligned axis label including the axis glyph
    pub label: String,
    pub line: String,
    /// Contributor column, present only when the sample had a breakdown
    pub gutter: Option<String>,
}

impl FrameRow {
    pub fn to_line(&self) -> String {
        let mut out = String::with_capacity(self.label.len() + self.line.len() + 32);
        out.push_str(&self.label);
        out.push_str(&self.line);
        if let Some(gutter) = &self.gutter {
            out.push_str(gutter);
        }
        out
    }
}

/// A fully rendered chart
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub title: String,
    /// Plot lines, top first
    pub rows: Vec<FrameRow>,
    /// Row index of every buffered value, 0 at the bottom
    pub cells: Vec<usize>,
    pub minimum: f64,
    pub maximum: f64,
}

impl Frame {
    /// Title followed by every plot line
    pub fn lines(&self) -> Vec<String> {
        std::iter::once(self.title.clone())
            .chain(self.rows.iter().map(FrameRow::to_line))
            .collect()
    }

    /// Number of terminal lines this frame occupies
    pub fn height(&self) -> usize {
        self.rows.len() + 1
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)?;
        for row in &self.rows {
            write!(f, "\n{}", row.to_line())?;
        }
        Ok(())
    }
}

/// Renders rolling buffers into fixed-size character grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridRenderer {
    resolution: Resolution,
    axis_width: usize,
    right_axis_width: usize,
}

impl GridRenderer {
    pub fn new(
        resolution: Resolution,
        axis_width: usize,
        right_axis_width: usize,
    ) -> Result<Self, PermonError> {
        if resolution.rows == 0 || resolution.cols == 0 {
            return Err(PermonError::Configuration(format!(
                "zero-sized chart resolution {}x{}",
                resolution.rows, resolution.cols
            )));
        }
        if resolution.rows < MIN_ROWS {
            return Err(PermonError::Configuration(format!(
                "chart needs at least {MIN_ROWS} rows, got {}",
                resolution.rows
            )));
        }
        if axis_width <= glyphs::AXIS.chars().count() {
            return Err(PermonError::Configuration(format!(
                "axis width {axis_width} leaves no room for labels"
            )));
        }
        if resolution.cols <= axis_width + right_axis_width {
            return Err(PermonError::Configuration(format!(
                "{} columns do not fit axis ({axis_width}) and gutter ({right_axis_width})",
                resolution.cols
            )));
        }

        Ok(Self {
            resolution,
            axis_width,
            right_axis_width,
        })
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Number of samples that fit between the axis and the gutter
    pub fn plot_width(&self) -> usize {
        self.resolution.cols - self.axis_width - self.right_axis_width
    }

    /// Render one frame.
    ///
    /// Fails with [`PermonError::Configuration`] when the axis labels would
    /// not fit into the axis width.
    pub fn render(
        &self,
        title: &str,
        values: &[f64],
        bounds: Bounds,
        contributors: &[Contributor],
    ) -> Result<Frame, PermonError> {
        if values.is_empty() {
            return Err(PermonError::Configuration(
                "cannot render an empty buffer".to_string(),
            ));
        }
        bounds.validate()?;

        let (minimum, maximum) = resolve_bounds(bounds, values);
        // One line is reserved for the title.
        let scale = Scale::new(minimum, maximum, self.resolution.rows - 1);
        let rows = scale.rows;
        let cells: Vec<usize> = values.iter().map(|&v| scale.cell(v)).collect();

        let labels = format_labels(&scale.label_values());
        let pad_width = self.axis_width - glyphs::AXIS.chars().count();
        let longest = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        if longest > pad_width {
            return Err(PermonError::Configuration(format!(
                "axis labels need {longest} columns but the axis only has {pad_width}"
            )));
        }

        let grid = draw_line(&cells, rows);

        let gutter = match cells.last() {
            Some(&latest) if !contributors.is_empty() && maximum > 0.0 => Some(
                gutter::build_gutter(
                    contributors,
                    maximum,
                    rows + 1,
                    latest + 1,
                    self.right_axis_width,
                ),
            ),
            _ => None,
        };

        let rows = labels
            .iter()
            .zip(grid)
            .enumerate()
            .map(|(i, (label, line))| FrameRow {
                label: format!("{label:>pad_width$}{}", glyphs::AXIS),
                line: line.into_iter().collect(),
                gutter: gutter.as_ref().map(|g| g[i].clone()),
            })
            .collect();

        Ok(Frame {
            title: title.to_string(),
            rows,
            cells,
            minimum,
            maximum,
        })
    }
}

/// Draw the line through `cells` onto a `(rows + 1) x cells.len()` grid,
/// top line first. The last column stays blank.
fn draw_line(cells: &[usize], rows: usize) -> Vec<Vec<char>> {
    let mut grid = vec![vec![' '; cells.len()]; rows + 1];

    for (x, pair) in cells.windows(2).enumerate() {
        let (current, next) = (pair[0], pair[1]);
        if current == next {
            grid[rows - current][x] = glyphs::HORIZONTAL;
            continue;
        }

        let (low, high) = if next > current {
            grid[rows - next][x] = glyphs::RISE_THEN_FLAT;
            grid[rows - current][x] = glyphs::FLAT_THEN_RISE;
            (current, next)
        } else {
            grid[rows - current][x] = glyphs::FLAT_THEN_FALL;
            grid[rows - next][x] = glyphs::FALL_THEN_FLAT;
            (next, current)
        };
        for y in low + 1..high {
            grid[rows - y][x] = glyphs::VERTICAL;
        }
    }
    grid
}
