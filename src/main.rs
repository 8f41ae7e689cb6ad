mod app;
mod state;
mod ui;

use std::path::PathBuf;

use app::RustySifApp;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let path = std::env::args_os().nth(1).map(PathBuf::from);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Rusty SIF – Spectrum Viewer",
        options,
        Box::new(|_cc| Ok(Box::new(RustySifApp::with_file(path)))),
    )
}
