//! Chart Plotter Module
//! Layout geometry shared by the static renderer: box plot whiskers and
//! fliers, axis ranges, palette.

use crate::stats::{QuartileSummary, StatsCalculator};
use plotters::style::RGBColor;

pub const PRIMARY_COLOR: RGBColor = RGBColor(52, 152, 219); // Blue
pub const FIT_COLOR: RGBColor = RGBColor(231, 76, 60); // Red

pub const PALETTE: [RGBColor; 10] = [
    RGBColor(52, 152, 219),  // Blue
    RGBColor(231, 76, 60),   // Red
    RGBColor(46, 204, 113),  // Green
    RGBColor(155, 89, 182),  // Purple
    RGBColor(243, 156, 18),  // Orange
    RGBColor(26, 188, 156),  // Teal
    RGBColor(233, 30, 99),   // Pink
    RGBColor(0, 188, 212),   // Cyan
    RGBColor(121, 85, 72),   // Brown
    RGBColor(96, 125, 139),  // Blue Grey
];

pub fn palette_color(index: usize) -> RGBColor {
    PALETTE[index % PALETTE.len()]
}

/// Box plot element for one group.
///
/// Whiskers reach the most extreme data points inside the 1.5·IQR fences;
/// anything beyond is a flier.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxGeometry {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_low: f64,
    pub whisker_high: f64,
    pub fliers: Vec<f64>,
}

impl BoxGeometry {
    /// `None` for an empty group.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let sorted = StatsCalculator::sorted(values);
        let q = QuartileSummary::from_values(&sorted);

        let whisker_low = sorted
            .iter()
            .copied()
            .find(|&v| v >= q.lower_bound)
            .unwrap_or(q.q1);
        let whisker_high = sorted
            .iter()
            .rev()
            .copied()
            .find(|&v| v <= q.upper_bound)
            .unwrap_or(q.q3);

        let fliers = sorted
            .iter()
            .copied()
            .filter(|&v| v < whisker_low || v > whisker_high)
            .collect();

        Some(Self {
            q1: q.q1,
            median: q.median,
            q3: q.q3,
            whisker_low,
            whisker_high,
            fliers,
        })
    }
}

/// Axis range covering `values` with `pad` fraction of headroom on both
/// sides. Never degenerate, so plotters always gets a drawable range.
pub fn padded_range<I>(values: I, pad: f64) -> (f64, f64)
where
    I: IntoIterator<Item = f64>,
{
    let (min, max) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    if (max - min).abs() < f64::EPSILON {
        return (min - 1.0, max + 1.0);
    }

    let margin = (max - min) * pad;
    (min - margin, max + margin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_geometry_with_flier() {
        let geometry = BoxGeometry::from_values(&[100.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert!((geometry.q1 - 2.25).abs() < 1e-12);
        assert!((geometry.median - 3.5).abs() < 1e-12);
        assert!((geometry.q3 - 4.75).abs() < 1e-12);
        assert_eq!(geometry.whisker_low, 1.0);
        assert_eq!(geometry.whisker_high, 5.0);
        assert_eq!(geometry.fliers, vec![100.0]);
    }

    #[test]
    fn test_box_geometry_without_fliers() {
        let geometry = BoxGeometry::from_values(&[10.0, 20.0, 30.0]).unwrap();
        assert_eq!(geometry.whisker_low, 10.0);
        assert_eq!(geometry.whisker_high, 30.0);
        assert!(geometry.fliers.is_empty());

        let single = BoxGeometry::from_values(&[7.0]).unwrap();
        assert_eq!(single.q1, 7.0);
        assert_eq!(single.whisker_high, 7.0);

        assert!(BoxGeometry::from_values(&[]).is_none());
    }

    #[test]
    fn test_padded_range() {
        assert_eq!(padded_range([0.0, 10.0], 0.1), (-1.0, 11.0));
        assert_eq!(padded_range([5.0, 5.0], 0.1), (4.0, 6.0));
        assert_eq!(padded_range(Vec::<f64>::new(), 0.1), (0.0, 1.0));
        assert_eq!(padded_range([f64::NAN, 2.0, 4.0], 0.0), (2.0, 4.0));
    }
}
