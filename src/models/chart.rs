//! Chart models

use chrono::{DateTime, Utc};

/// Which Y axis a series is scaled against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YAxis {
    Left,
    Right,
}

/// A single line series, broken into runs wherever a value is missing
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub axis: YAxis,
    /// Consecutive points drawn as one connected line; never empty
    pub segments: Vec<Vec<(DateTime<Utc>, f64)>>,
}

impl Series {
    /// Every point across all runs, in input order
    pub fn points(&self) -> impl Iterator<Item = &(DateTime<Utc>, f64)> {
        self.segments.iter().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Min and max of the Y values, `None` for an empty series
    pub fn y_bounds(&self) -> Option<(f64, f64)> {
        let mut values = self.points().map(|(_, y)| *y);
        let first = values.next()?;
        Some(values.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y))))
    }

    pub fn x_bounds(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let mut xs = self.points().map(|(x, _)| *x);
        let first = xs.next()?;
        Some(xs.fold((first, first), |(lo, hi), x| (lo.min(x), hi.max(x))))
    }
}

/// Outer margins in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

/// Fixed visual theme applied to every chart
#[derive(Debug, Clone, PartialEq)]
pub struct ChartStyle {
    pub width: u32,
    pub height: u32,
    pub margins: Margins,
    pub title_font_size: u32,
    pub axis_title_font_size: u32,
    pub tick_font_size: u32,
    pub legend_font_size: u32,
    pub line_width: u32,
    pub x_tick_format: &'static str,
    /// Primary then secondary line colors (RGB)
    pub colors: [(u8, u8, u8); 2],
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            width: 1100,
            height: 600,
            margins: Margins {
                left: 80,
                right: 80,
                top: 100,
                bottom: 80,
            },
            title_font_size: 20,
            axis_title_font_size: 16,
            tick_font_size: 12,
            legend_font_size: 12,
            line_width: 2,
            x_tick_format: "%b %Y",
            colors: [(99, 110, 250), (239, 85, 59)],
        }
    }
}

/// A time-series chart with one or two independently scaled Y axes
#[derive(Debug, Clone, PartialEq)]
pub struct DualAxisChart {
    pub title: String,
    pub x_label: String,
    pub primary: Series,
    pub secondary: Option<Series>,
    pub style: ChartStyle,
}

impl DualAxisChart {
    /// `"Y1 [vs Y2] over X"`
    pub fn title_for(x_col: &str, y1_col: &str, y2_col: Option<&str>) -> String {
        match y2_col {
            Some(y2) => format!("{} vs {} over {}", y1_col, y2, x_col),
            None => format!("{} over {}", y1_col, x_col),
        }
    }

    pub fn series(&self) -> impl Iterator<Item = &Series> {
        std::iter::once(&self.primary).chain(self.secondary.iter())
    }

    /// True when no series has a single point
    pub fn is_empty(&self) -> bool {
        self.series().all(Series::is_empty)
    }

    /// Shared X range over every series
    pub fn x_bounds(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        self.series()
            .filter_map(Series::x_bounds)
            .reduce(|(lo, hi), (l, h)| (lo.min(l), hi.max(h)))
    }
}
