use eframe::egui;

use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RustySifApp {
    pub state: AppState,
}

impl RustySifApp {
    /// Start with `path` already loaded, if given.
    pub fn with_file(path: Option<std::path::PathBuf>) -> Self {
        let mut app = Self::default();
        if let Some(path) = path {
            app.state.load(&path);
        }
        app
    }
}

impl eframe::App for RustySifApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: metadata ----
        egui::SidePanel::left("info_panel")
            .default_width(320.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: plot ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::spectrum_plot(ui, &self.state);
        });
    }
}
