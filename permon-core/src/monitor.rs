//! One chart: a metric source, its rolling buffer and a renderer

use crate::history::RollingBuffer;
use crate::render::{Frame, GridRenderer, Resolution};
use crate::sample::{Bounds, Contributor};
use crate::stats::MetricSource;
use crate::PermonError;

/// Axis widths of a chart in columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub axis_width: usize,
    pub right_axis_width: usize,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            axis_width: 10,
            right_axis_width: 20,
        }
    }
}

/// Drives one [`MetricSource`] into one chart.
pub struct Monitor {
    source: Box<dyn MetricSource>,
    buffer: RollingBuffer,
    renderer: GridRenderer,
    bounds: Bounds,
    contributors: Vec<Contributor>,
}

impl Monitor {
    /// The buffer spans the plot width and is prefilled with the source's
    /// minimum, or 0 when the minimum is adaptive.
    pub fn new(
        source: Box<dyn MetricSource>,
        resolution: Resolution,
        layout: Layout,
    ) -> Result<Self, PermonError> {
        let renderer = GridRenderer::new(resolution, layout.axis_width, layout.right_axis_width)?;
        let bounds = source.bounds();
        bounds.validate()?;

        let fill = bounds.minimum.unwrap_or(0.0);
        Ok(Self {
            buffer: RollingBuffer::new(renderer.plot_width(), fill),
            source,
            renderer,
            bounds,
            contributors: Vec::new(),
        })
    }

    /// Sample the source once and append the value. Returns the new value.
    pub fn update(&mut self) -> f64 {
        let (value, contributors) = self.source.sample().into_parts();
        self.buffer.push(value);
        self.contributors = contributors;
        value
    }

    /// Render the current buffer.
    pub fn paint(&mut self) -> Result<Frame, PermonError> {
        let title = self.source.name().to_string();
        self.renderer.render(
            &title,
            self.buffer.as_slice(),
            self.bounds,
            &self.contributors,
        )
    }

    pub fn tag(&self) -> &str {
        self.source.tag()
    }

    pub fn name(&self) -> &str {
        self.source.name()
    }

    pub fn buffer(&self) -> &RollingBuffer {
        &self.buffer
    }

    pub fn latest_contributors(&self) -> &[Contributor] {
        &self.contributors
    }

    pub fn renderer(&self) -> &GridRenderer {
        &self.renderer
    }
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("tag", &self.source.tag())
            .field("bounds", &self.bounds)
            .field("capacity", &self.buffer.capacity())
            .finish()
    }
}
