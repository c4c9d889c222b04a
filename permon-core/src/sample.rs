//! Values produced by a metric source on every tick

use crate::PermonError;

/// A named share of a parent metric (usually a process name)
#[derive(Debug, Clone, PartialEq)]
pub struct Contributor {
    pub name: String,
    pub value: f64,
}

impl Contributor {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// One sample of a metric: a scalar, optionally with a breakdown of who
/// contributed to it.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricSample {
    Scalar(f64),
    Breakdown {
        value: f64,
        contributors: Vec<Contributor>,
    },
}

impl MetricSample {
    pub fn value(&self) -> f64 {
        match self {
            MetricSample::Scalar(value) => *value,
            MetricSample::Breakdown { value, .. } => *value,
        }
    }

    /// Contributors of this sample; empty for scalar samples
    pub fn contributors(&self) -> &[Contributor] {
        match self {
            MetricSample::Scalar(_) => &[],
            MetricSample::Breakdown { contributors, .. } => contributors,
        }
    }

    pub fn has_breakdown(&self) -> bool {
        matches!(self, MetricSample::Breakdown { .. })
    }

    pub fn into_parts(self) -> (f64, Vec<Contributor>) {
        match self {
            MetricSample::Scalar(value) => (value, Vec::new()),
            MetricSample::Breakdown {
                value,
                contributors,
            } => (value, contributors),
        }
    }
}

impl From<f64> for MetricSample {
    fn from(value: f64) -> Self {
        MetricSample::Scalar(value)
    }
}

/// Axis bounds of a metric. `None` means the bound is adaptive and gets
/// derived from the buffered history on every frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

impl Bounds {
    /// Both bounds fixed
    pub fn fixed(minimum: f64, maximum: f64) -> Self {
        Self {
            minimum: Some(minimum),
            maximum: Some(maximum),
        }
    }

    /// Minimum fixed, maximum adaptive
    pub fn from_minimum(minimum: f64) -> Self {
        Self {
            minimum: Some(minimum),
            maximum: None,
        }
    }

    pub fn adaptive() -> Self {
        Self::default()
    }

    pub fn is_fixed(&self) -> bool {
        self.minimum.is_some() && self.maximum.is_some()
    }

    /// Rejects fully known bounds that span a zero range.
    pub fn validate(&self) -> Result<(), PermonError> {
        if let (Some(min), Some(max)) = (self.minimum, self.maximum) {
            let range = (max - min).abs();
            if range.is_nan() || range <= 0.0 {
                return Err(PermonError::Configuration(format!(
                    "graph range must be greater than zero (min {min}, max {max})"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_sample_has_no_contributors() {
        let sample = MetricSample::from(4.5);
        assert_eq!(sample.value(), 4.5);
        assert!(sample.contributors().is_empty());
        assert!(!sample.has_breakdown());
    }

    #[test]
    fn breakdown_sample_keeps_order() {
        let sample = MetricSample::Breakdown {
            value: 10.0,
            contributors: vec![Contributor::new("other", 2.0), Contributor::new("a", 8.0)],
        };
        assert!(sample.has_breakdown());
        let (value, contributors) = sample.into_parts();
        assert_eq!(value, 10.0);
        assert_eq!(contributors[0].name, "other");
        assert_eq!(contributors[1].name, "a");
    }

    #[test]
    fn zero_range_bounds_are_rejected() {
        assert!(Bounds::fixed(5.0, 5.0).validate().is_err());
        assert!(Bounds::fixed(0.0, 100.0).validate().is_ok());
        assert!(Bounds::from_minimum(0.0).validate().is_ok());
        assert!(Bounds::adaptive().validate().is_ok());
    }

    #[test]
    fn nan_bounds_are_rejected() {
        assert!(Bounds::fixed(0.0, f64::NAN).validate().is_err());
    }
}
