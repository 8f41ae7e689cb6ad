use eframe::egui::Ui;
use egui_plot::{Line, Plot, PlotPoints};
use ndarray::{s, Axis};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Spectrum plot (central panel)
// ---------------------------------------------------------------------------

/// Render every image row of the selected frame against the current axis.
pub fn spectrum_plot(ui: &mut Ui, state: &AppState) {
    let (spectrum, x) = match (&state.spectrum, state.x_values()) {
        (Some(sp), Some(x)) => (sp, x),
        _ => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("Open a SIF file to view it  (File → Open…)");
            });
            return;
        }
    };

    let frame = state.frame.min(spectrum.frames().saturating_sub(1));
    let image = spectrum.data().slice(s![frame, .., ..]);

    Plot::new("spectrum_plot")
        .legend(egui_plot::Legend::default())
        .x_axis_label(state.axis.label())
        .y_axis_label("Counts")
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for (r, row) in image.axis_iter(Axis(0)).enumerate() {
                let points: PlotPoints = x
                    .iter()
                    .zip(row.iter())
                    .map(|(&xi, &yi)| [xi, f64::from(yi)])
                    .collect();

                let line = Line::new(points).name(format!("row {r}")).width(1.5);
                plot_ui.line(line);
            }
        });
}
