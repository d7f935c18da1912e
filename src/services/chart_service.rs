use chrono::{DateTime, Duration, Utc};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::models::{ChartStyle, Column, Dataset, DualAxisChart, Series, YAxis};
use crate::utils::time::{parse_timestamp, timestamp_from_value};

/// Errors raised while building or rendering a chart
#[derive(Debug, Error)]
pub enum PlotError {
    #[error("Column '{0}' not found in dataset")]
    MissingColumn(String),
    #[error("Column '{column}' row {row}: cannot parse {value} as a timestamp")]
    InvalidTimestamp {
        column: String,
        row: usize,
        value: String,
    },
    #[error("Cannot parse time bound '{0}' as a timestamp")]
    InvalidBound(String),
    #[error("Column '{column}' row {row}: {value} is not numeric")]
    NonNumeric {
        column: String,
        row: usize,
        value: String,
    },
    #[error("No data points to draw")]
    NoData,
    #[error("Failed to render chart: {0}")]
    Render(String),
}

fn render_err<E: std::fmt::Display>(e: E) -> PlotError {
    PlotError::Render(e.to_string())
}

fn require_column<'a>(dataset: &'a Dataset, name: &str) -> Result<&'a Column, PlotError> {
    dataset
        .column(name)
        .ok_or_else(|| PlotError::MissingColumn(name.to_string()))
}

fn parse_bound(raw: &str) -> Result<DateTime<Utc>, PlotError> {
    parse_timestamp(raw).ok_or_else(|| PlotError::InvalidBound(raw.to_string()))
}

/// Numeric value of a Y cell; `None` means "no point" (null or non-finite)
fn numeric_cell(column: &str, row: usize, value: &Value) -> Result<Option<f64>, PlotError> {
    let parsed = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(y) if y.is_finite() => Ok(Some(y)),
        Some(_) => Ok(None),
        None => Err(PlotError::NonNumeric {
            column: column.to_string(),
            row,
            value: value.to_string(),
        }),
    }
}

/// Split the selected rows into runs of drawable points.
/// A row with no timestamp or no numeric value ends the current run.
fn collect_series(
    column: &Column,
    axis: YAxis,
    timestamps: &[Option<DateTime<Utc>>],
    rows: &[usize],
) -> Result<Series, PlotError> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    for &row in rows {
        let y = numeric_cell(&column.name, row, &column.values[row])?;
        match timestamps[row].zip(y) {
            Some(point) => current.push(point),
            None if !current.is_empty() => segments.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }

    Ok(Series {
        name: column.name.clone(),
        axis,
        segments,
    })
}

/// Build a dual-axis chart from `dataset` without drawing anything.
///
/// The X column is converted to timestamps as a whole, then rows outside the
/// inclusive `[start_time, end_time]` range are dropped. Null X cells are
/// dropped by any bound and otherwise break the line, as do missing Y values.
/// Points keep the input row order. An empty range is not an error: the
/// series are simply empty.
pub fn build_chart(
    dataset: &Dataset,
    x_col: &str,
    y1_col: &str,
    y2_col: Option<&str>,
    start_time: Option<&str>,
    end_time: Option<&str>,
) -> Result<DualAxisChart, PlotError> {
    let y2_col = y2_col.filter(|name| !name.is_empty());

    let x_column = require_column(dataset, x_col)?;
    let y1_column = require_column(dataset, y1_col)?;
    let y2_column = y2_col
        .map(|name| require_column(dataset, name))
        .transpose()?;

    let start = start_time.map(parse_bound).transpose()?;
    let end = end_time.map(parse_bound).transpose()?;

    let timestamps = x_column
        .values
        .iter()
        .enumerate()
        .map(|(row, value)| match value {
            Value::Null => Ok(None),
            _ => timestamp_from_value(value)
                .map(Some)
                .ok_or_else(|| PlotError::InvalidTimestamp {
                    column: x_col.to_string(),
                    row,
                    value: value.to_string(),
                }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let bounded = start.is_some() || end.is_some();
    let rows: Vec<usize> = timestamps
        .iter()
        .enumerate()
        .filter(|(_, t)| match t {
            Some(t) => start.map_or(true, |s| *t >= s) && end.map_or(true, |e| *t <= e),
            None => !bounded,
        })
        .map(|(row, _)| row)
        .collect();

    debug!(
        "Building chart for {} of {} rows (start: {:?}, end: {:?})",
        rows.len(),
        timestamps.len(),
        start,
        end
    );

    let primary = collect_series(y1_column, YAxis::Left, &timestamps, &rows)?;
    let secondary = y2_column
        .map(|column| collect_series(column, YAxis::Right, &timestamps, &rows))
        .transpose()?;

    Ok(DualAxisChart {
        title: DualAxisChart::title_for(x_col, y1_col, y2_col),
        x_label: x_col.to_string(),
        primary,
        secondary,
        style: ChartStyle::default(),
    })
}

/// Pad a Y range by 10% so lines do not touch the frame
fn padded_range(bounds: Option<(f64, f64)>) -> (f64, f64) {
    let (lo, hi) = bounds.unwrap_or((0.0, 1.0));
    let padding = if hi > lo {
        (hi - lo) * 0.1
    } else {
        (lo.abs() * 0.1).max(1.0)
    };
    (lo - padding, hi + padding)
}

/// A single instant cannot span an axis; widen it by a day either side,
/// as far as the representable range allows
fn widened(lo: DateTime<Utc>, hi: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    if lo < hi {
        return (lo, hi);
    }
    (
        lo.checked_sub_signed(Duration::days(1)).unwrap_or(lo),
        hi.checked_add_signed(Duration::days(1)).unwrap_or(hi),
    )
}

const LEGEND_SAMPLE_WIDTH: i32 = 20;
const LEGEND_SAMPLE_GAP: i32 = 6;
const LEGEND_ENTRY_SPACING: i32 = 24;

/// Left edge of each legend entry laid out in one centred row
fn legend_offsets(text_widths: &[i32], area_width: i32) -> Vec<i32> {
    let entry_width = |w: &i32| LEGEND_SAMPLE_WIDTH + LEGEND_SAMPLE_GAP + w;
    let total: i32 = text_widths.iter().map(entry_width).sum::<i32>()
        + LEGEND_ENTRY_SPACING * (text_widths.len() as i32 - 1).max(0);

    let mut x = (area_width - total).max(0) / 2;
    text_widths
        .iter()
        .map(|w| {
            let left = x;
            x += entry_width(w) + LEGEND_ENTRY_SPACING;
            left
        })
        .collect()
}

fn font(size: u32) -> FontDesc<'static> {
    ("sans-serif", f64::from(size)).into_font()
}

fn rgb((r, g, b): (u8, u8, u8)) -> RGBColor {
    RGBColor(r, g, b)
}

/// Draw `chart` as a PNG at `output_path`
pub fn render_png(chart: &DualAxisChart, output_path: &Path) -> Result<(), PlotError> {
    let (x_min, x_max) = chart.x_bounds().ok_or(PlotError::NoData)?;
    let (x_min, x_max) = widened(x_min, x_max);

    let primary_bounds = chart.primary.y_bounds();
    let (y1_min, y1_max) = padded_range(primary_bounds);
    let (y2_min, y2_max) = padded_range(
        chart
            .secondary
            .as_ref()
            .and_then(Series::y_bounds)
            .or(primary_bounds),
    );

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent).map_err(render_err)?;
    }

    let style = &chart.style;
    let primary_color = rgb(style.colors[0]);
    let secondary_color = rgb(style.colors[1]);
    let line_width = style.line_width;
    let grid_color = RGBColor(235, 240, 248);

    let root = BitMapBackend::new(output_path, (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    // Title and a one-row legend share the top margin; the plot gets the rest
    let (header, body) = root.split_vertically(style.margins.top as i32);
    let legend_area = header
        .titled(&chart.title, font(style.title_font_size))
        .map_err(render_err)?;

    let legend_style = TextStyle::from(font(style.legend_font_size))
        .pos(Pos::new(HPos::Left, VPos::Center));
    let entries: Vec<(&str, RGBColor)> = chart
        .series()
        .zip([primary_color, secondary_color])
        .map(|(series, color)| (series.name.as_str(), color))
        .collect();
    let mut text_widths = Vec::with_capacity(entries.len());
    for (name, _) in &entries {
        let (w, _) = legend_area
            .estimate_text_size(name, &legend_style)
            .map_err(render_err)?;
        text_widths.push(w as i32);
    }
    let (legend_width, legend_height) = legend_area.dim_in_pixel();
    let y = legend_height as i32 / 2;
    for ((name, color), x) in entries
        .iter()
        .zip(legend_offsets(&text_widths, legend_width as i32))
    {
        legend_area
            .draw(&PathElement::new(
                vec![(x, y), (x + LEGEND_SAMPLE_WIDTH, y)],
                color.stroke_width(line_width),
            ))
            .map_err(render_err)?;
        legend_area
            .draw(&Text::new(
                *name,
                (x + LEGEND_SAMPLE_WIDTH + LEGEND_SAMPLE_GAP, y),
                legend_style.clone(),
            ))
            .map_err(render_err)?;
    }

    let mut ctx = ChartBuilder::on(&body)
        .margin(10)
        .x_label_area_size(style.margins.bottom)
        .y_label_area_size(style.margins.left)
        .right_y_label_area_size(if chart.secondary.is_some() {
            style.margins.right
        } else {
            10
        })
        .build_cartesian_2d(x_min..x_max, y1_min..y1_max)
        .map_err(render_err)?
        .set_secondary_coord(x_min..x_max, y2_min..y2_max);

    let tick_format = style.x_tick_format;
    ctx.configure_mesh()
        .x_desc(chart.x_label.as_str())
        .y_desc(chart.primary.name.as_str())
        .x_label_formatter(&|x: &DateTime<Utc>| x.format(tick_format).to_string())
        .axis_desc_style(font(style.axis_title_font_size))
        .label_style(font(style.tick_font_size))
        .bold_line_style(ShapeStyle::from(&grid_color).stroke_width(1))
        .light_line_style(ShapeStyle::from(&WHITE))
        .draw()
        .map_err(render_err)?;

    for segment in &chart.primary.segments {
        ctx.draw_series(LineSeries::new(
            segment.iter().copied(),
            primary_color.stroke_width(line_width),
        ))
        .map_err(render_err)?;
    }

    if let Some(secondary) = &chart.secondary {
        // Secondary axes never draw grid lines
        ctx.configure_secondary_axes()
            .y_desc(secondary.name.as_str())
            .axis_desc_style(font(style.axis_title_font_size))
            .label_style(font(style.tick_font_size))
            .draw()
            .map_err(render_err)?;

        for segment in &secondary.segments {
            ctx.draw_secondary_series(LineSeries::new(
                segment.iter().copied(),
                secondary_color.stroke_width(line_width),
            ))
            .map_err(render_err)?;
        }
    }

    root.present().map_err(render_err)?;

    Ok(())
}

static RENDER_SEQ: AtomicU64 = AtomicU64::new(0);

/// Scratch PNG path, unique per call within this process
fn temp_chart_path() -> PathBuf {
    std::env::temp_dir().join(format!(
        "query_aux_chart_{}_{}_{}.png",
        std::process::id(),
        Utc::now().timestamp_millis(),
        RENDER_SEQ.fetch_add(1, Ordering::Relaxed)
    ))
}

/// Draw `chart` and return the PNG bytes
pub fn render_png_bytes(chart: &DualAxisChart) -> Result<Vec<u8>, PlotError> {
    let temp_file = temp_chart_path();

    let rendered = render_png(chart, &temp_file);
    let image_data = rendered.and_then(|_| std::fs::read(&temp_file).map_err(render_err));

    let _ = std::fs::remove_file(&temp_file);

    image_data
}

/// Build the chart and write it to `output_path` as a PNG
pub fn plot(
    dataset: &Dataset,
    x_col: &str,
    y1_col: &str,
    y2_col: Option<&str>,
    start_time: Option<&str>,
    end_time: Option<&str>,
    output_path: &Path,
) -> Result<DualAxisChart, PlotError> {
    let chart = build_chart(dataset, x_col, y1_col, y2_col, start_time, end_time)?;
    render_png(&chart, output_path)?;
    info!("Chart '{}' written to {}", chart.title, output_path.display());
    Ok(chart)
}

/// Like [`plot`], but logs any failure and returns `None` instead
pub fn plot_or_log(
    dataset: &Dataset,
    x_col: &str,
    y1_col: &str,
    y2_col: Option<&str>,
    start_time: Option<&str>,
    end_time: Option<&str>,
    output_path: &Path,
) -> Option<DualAxisChart> {
    match plot(dataset, x_col, y1_col, y2_col, start_time, end_time, output_path) {
        Ok(chart) => Some(chart),
        Err(e) => {
            error!("Failed to generate chart: {}", e);
            None
        }
    }
}
