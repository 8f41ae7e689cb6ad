use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};
use rusty_sif::data::info::{info_sections, TABLE_HEADERS};
use rusty_sif::{AxisKind, MetadataValue};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – acquisition details
// ---------------------------------------------------------------------------

/// Render the left metadata panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Acquisition");
    ui.separator();

    let Some(spectrum) = &state.spectrum else {
        ui.label("No file loaded.");
        return;
    };

    ui.label(RichText::new(spectrum.summary()).monospace());

    let frames = spectrum.frames();
    if frames > 1 {
        ui.add(egui::Slider::new(&mut state.frame, 0..=frames - 1).text("Frame"));
    }

    ui.separator();
    ui.horizontal(|ui: &mut Ui| {
        ui.checkbox(&mut state.show_timestamps, "Timestamps");
        ui.checkbox(&mut state.show_tiles, "Tiles");
    });

    let sections = info_sections(spectrum.info(), !state.show_timestamps, !state.show_tiles);

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.push_id("main_info", |ui: &mut Ui| metadata_table(ui, &sections.main));
            if let Some(extra) = &sections.extra {
                ui.add_space(8.0);
                ui.push_id("extra_info", |ui: &mut Ui| metadata_table(ui, extra));
            }
        });
}

/// Two-column key/value table.
fn metadata_table(ui: &mut Ui, rows: &[(&str, &MetadataValue)]) {
    TableBuilder::new(ui)
        .striped(true)
        .column(Column::auto().resizable(true))
        .column(Column::remainder())
        .header(20.0, |mut header| {
            for title in TABLE_HEADERS {
                header.col(|ui: &mut Ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|mut body| {
            for (key, value) in rows {
                body.row(18.0, |mut row| {
                    row.col(|ui: &mut Ui| {
                        ui.label(*key);
                    });
                    row.col(|ui: &mut Ui| {
                        ui.label(value.to_string());
                    });
                });
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            let can_save = state.spectrum.is_some();
            if ui.add_enabled(can_save, egui::Button::new("Save PNG")).clicked() {
                state.save_png();
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(sp) = &state.spectrum {
            ui.label(sp.filename());
        }

        ui.separator();

        for kind in [AxisKind::Wavelength, AxisKind::RamanShift] {
            if ui.selectable_label(state.axis == kind, kind.label()).clicked() {
                state.set_axis(kind);
            }
        }

        if let Some(msg) = &state.status_message {
            let color = if msg.starts_with("Error") || msg.starts_with("Cannot") {
                Color32::RED
            } else {
                Color32::GRAY
            };
            ui.label(RichText::new(msg).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open SIF file")
        .add_filter("Andor SIF", &["sif"])
        .pick_file();

    if let Some(path) = file {
        state.load(&path);
    }
}
