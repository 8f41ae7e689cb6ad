//! Static line-chart rendering to PNG.

use std::ops::Range;
use std::path::Path;

use image::{imageops, ImageFormat, Rgb, RgbImage};
use plotters::backend::BitMapBackend;
use plotters::chart::ChartBuilder;
use plotters::drawing::IntoDrawingArea;
use plotters::series::LineSeries;
use plotters::style::colors::WHITE;
use plotters::style::{RGBColor, ShapeStyle};
use thiserror::Error;

/// Points per inch; font sizes are given in points.
const POINTS_PER_INCH: f64 = 72.0;

/// Rendering errors.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("nothing to plot: {0}")]
    EmptySeries(&'static str),

    #[error("x has {x} values but y has {y}")]
    LengthMismatch { x: usize, y: usize },

    #[error("drawing failed: {0}")]
    Draw(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("viewer error: {0}")]
    Viewer(String),
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Styling and output options for one chart.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub font_family: String,
    /// Figure size in inches.
    pub figure_size: (f64, f64),
    pub dpi: u32,
    pub axis_label_pt: f64,
    pub tick_label_pt: f64,
    pub line_width_pt: f64,
    pub line_color: RGBColor,
    pub y_label: String,
    /// Crop to the drawn content plus `pad_inches`.
    pub tight_bbox: bool,
    pub pad_inches: f64,
    /// Open an interactive window after saving.
    pub show: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font_family: "sans-serif".to_string(),
            figure_size: (11.0, 6.0),
            dpi: 500,
            axis_label_pt: 22.0,
            tick_label_pt: 14.0,
            line_width_pt: 1.5,
            line_color: RGBColor(31, 119, 180),
            y_label: "Counts".to_string(),
            tight_bbox: true,
            pad_inches: 0.1,
            show: true,
        }
    }
}

impl RenderConfig {
    /// Same styling without the interactive window.
    pub fn headless(self) -> Self {
        Self { show: false, ..self }
    }

    pub fn with_dpi(self, dpi: u32) -> Self {
        Self { dpi, ..self }
    }

    /// Canvas size in pixels.
    pub fn pixel_size(&self) -> (u32, u32) {
        let (w, h) = self.figure_size;
        (
            (w * f64::from(self.dpi)).round().max(1.0) as u32,
            (h * f64::from(self.dpi)).round().max(1.0) as u32,
        )
    }

    fn px(&self, points: f64) -> f64 {
        points * f64::from(self.dpi) / POINTS_PER_INCH
    }
}

// ---------------------------------------------------------------------------
// Chart
// ---------------------------------------------------------------------------

/// One x/y series with its axis description.
#[derive(Debug, Clone, Copy)]
pub struct LineChart<'a> {
    pub x: &'a [f64],
    pub y: &'a [f64],
    pub x_label: &'a str,
}

impl<'a> LineChart<'a> {
    fn validate(&self) -> Result<(), RenderError> {
        if self.x.len() != self.y.len() {
            return Err(RenderError::LengthMismatch {
                x: self.x.len(),
                y: self.y.len(),
            });
        }
        if self.x.is_empty() {
            return Err(RenderError::EmptySeries("no samples"));
        }
        Ok(())
    }
}

/// Axis range with a 5% margin on both sides, or ±0.5 for a flat series.
pub fn padded_range(values: &[f64]) -> Range<f64> {
    let (min, max) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if !min.is_finite() {
        return 0.0..1.0;
    }
    let span = max - min;
    let padding = if span < 1e-12 { 0.5 } else { span * 0.05 };
    (min - padding)..(max + padding)
}

/// Tick label text: plain integers for large magnitudes, otherwise up to
/// three significant decimals.
pub fn format_tick(value: f64) -> String {
    if value.abs() >= 100.0 || value == value.trunc() {
        format!("{value:.0}")
    } else if value.abs() >= 1.0 {
        format!("{value:.1}")
    } else {
        format!("{value:.3}")
    }
}

/// Render `chart` into an RGB image.
pub fn render_line_chart(chart: &LineChart<'_>, config: &RenderConfig) -> Result<RgbImage, RenderError> {
    chart.validate()?;
    let (width, height) = config.pixel_size();
    let mut buffer = vec![255u8; width as usize * height as usize * 3];

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let label_px = config.px(config.axis_label_pt).round() as i32;
        let tick_px = config.px(config.tick_label_pt).round() as i32;
        let margin = config.px(12.0).round() as u32;
        let x_area = (label_px + tick_px) as u32 * 2;
        let y_area = (label_px as u32) + tick_px as u32 * 5;

        let mut plot = ChartBuilder::on(&root)
            .margin(margin)
            .x_label_area_size(x_area)
            .y_label_area_size(y_area)
            .build_cartesian_2d(padded_range(chart.x), padded_range(chart.y))
            .map_err(draw_err)?;

        let family = config.font_family.as_str();
        let mesh = plot
            .configure_mesh()
            .disable_mesh()
            .x_desc(chart.x_label)
            .y_desc(config.y_label.as_str())
            .label_style((family, tick_px))
            .axis_desc_style((family, label_px))
            .x_label_formatter(&|v| format_tick(*v))
            .y_label_formatter(&|v| format_tick(*v))
            .draw();
        if let Err(e) = mesh {
            log::warn!("axis labels unavailable, drawing bare series: {e}");
        }

        let stroke = config.px(config.line_width_pt).round().max(1.0) as u32;
        plot.draw_series(LineSeries::new(
            chart.x.iter().copied().zip(chart.y.iter().copied()),
            ShapeStyle::from(&config.line_color).stroke_width(stroke),
        ))
        .map_err(draw_err)?;

        root.present().map_err(draw_err)?;
    }

    let image = RgbImage::from_raw(width, height, buffer)
        .ok_or(RenderError::EmptySeries("canvas buffer size"))?;
    if config.tight_bbox {
        let pad = config.pad_inches * f64::from(config.dpi);
        Ok(tight_crop(&image, pad.round() as u32))
    } else {
        Ok(image)
    }
}

/// Render and save `chart` as a PNG file.
pub fn save_line_chart(
    chart: &LineChart<'_>,
    path: &Path,
    config: &RenderConfig,
) -> Result<(), RenderError> {
    let image = render_line_chart(chart, config)?;
    image.save_with_format(path, ImageFormat::Png)?;
    log::debug!(
        "wrote {}x{} chart to {}",
        image.width(),
        image.height(),
        path.display()
    );
    Ok(())
}

/// Crop away the white border, keeping `pad` pixels around the content.
pub fn tight_crop(image: &RgbImage, pad: u32) -> RgbImage {
    const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        if *pixel == BACKGROUND {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }
    let Some((x0, y0, x1, y1)) = bounds else {
        return image.clone();
    };

    let left = x0.saturating_sub(pad);
    let top = y0.saturating_sub(pad);
    let right = (x1 + pad).min(image.width() - 1);
    let bottom = (y1 + pad).min(image.height() - 1);
    imageops::crop_imm(image, left, top, right - left + 1, bottom - top + 1).to_image()
}

fn draw_err<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Draw(e.to_string())
}
