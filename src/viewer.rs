//! Interactive chart window.

use eframe::egui;
use egui_plot::{Line, Plot, PlotPoints};

use crate::render::RenderError;

struct ChartWindow {
    title: String,
    points: Vec<[f64; 2]>,
    x_label: String,
    y_label: String,
}

impl eframe::App for ChartWindow {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            Plot::new("chart_window")
                .x_axis_label(self.x_label.as_str())
                .y_axis_label(self.y_label.as_str())
                .allow_boxed_zoom(true)
                .show(ui, |plot_ui| {
                    let points = PlotPoints::from(self.points.clone());
                    plot_ui.line(Line::new(points).name(&self.title).width(1.5));
                });
        });
    }
}

/// Open a blocking window with one x/y line. Returns when it is closed.
pub fn show_chart(
    title: &str,
    x: &[f64],
    y: &[f64],
    x_label: &str,
    y_label: &str,
) -> Result<(), RenderError> {
    if x.len() != y.len() {
        return Err(RenderError::LengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }

    let window = ChartWindow {
        title: title.to_string(),
        points: x.iter().zip(y).map(|(&xi, &yi)| [xi, yi]).collect(),
        x_label: x_label.to_string(),
        y_label: y_label.to_string(),
    };
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1100.0, 600.0]),
        ..Default::default()
    };

    log::debug!("opening chart window for {title}");
    eframe::run_native(title, options, Box::new(|_cc| Ok(Box::new(window))))
        .map_err(|e| RenderError::Viewer(e.to_string()))
}
