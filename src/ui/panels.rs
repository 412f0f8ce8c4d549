use eframe::egui::{self, Color32, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::colormap::Colormap;
use crate::data::loader::load_images;
use crate::model::{format_shape, Sequential};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – display, playback and layer selection
// ---------------------------------------------------------------------------

/// Render the left panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Display");
    ui.separator();

    // ---- Colormap selector ----
    ui.strong("Colormap");
    let current = state.settings.figure.cmap;
    egui::ComboBox::from_id_salt("colormap")
        .selected_text(current.name())
        .show_ui(ui, |ui: &mut Ui| {
            for cmap in Colormap::ALL {
                if ui.selectable_label(current == cmap, cmap.name()).clicked() {
                    state.set_colormap(cmap);
                }
            }
        });
    ui.separator();

    // ---- Frame and playback ----
    let len = state.sequence.as_ref().map_or(0, |s| s.len());
    if len > 0 {
        ui.strong("Sequence");
        let mut frame = state.current_frame;
        let slider = egui::Slider::new(&mut frame, 0..=len - 1).text("Frame");
        if ui.add_enabled(!state.is_playing(), slider).changed() {
            state.set_frame(frame);
        }

        ui.horizontal(|ui: &mut Ui| {
            ui.label("Range");
            ui.add(egui::DragValue::new(&mut state.settings.sequence_start).range(0..=len));
            ui.label("to");
            ui.add(egui::DragValue::new(&mut state.settings.sequence_end).range(0..=len));
        });

        if state.is_playing() {
            if ui.button("⏹ Stop").clicked() {
                state.stop_playback();
            }
        } else if ui.button("▶ Play").clicked() {
            state.start_playback();
        }
        ui.separator();
    }

    // ---- Layer table ----
    ui.heading("Layers");
    if state.layers.is_empty() {
        ui.label("No model loaded.");
        return;
    }

    let mut toggled: Option<String> = None;
    TableBuilder::new(ui)
        .striped(true)
        .column(Column::auto())
        .column(Column::auto())
        .column(Column::remainder())
        .header(18.0, |mut header| {
            header.col(|ui: &mut Ui| {
                ui.strong("Layer");
            });
            header.col(|ui: &mut Ui| {
                ui.strong("Type");
            });
            header.col(|ui: &mut Ui| {
                ui.strong("Output shape");
            });
        })
        .body(|mut body| {
            for layer in &state.layers {
                body.row(20.0, |mut row| {
                    row.col(|ui: &mut Ui| {
                        let mut checked = state.selected_layers.contains(&layer.name);
                        if ui.checkbox(&mut checked, layer.name.as_str()).changed() {
                            toggled = Some(layer.name.clone());
                        }
                    });
                    row.col(|ui: &mut Ui| {
                        ui.label(layer.kind.to_string());
                    });
                    row.col(|ui: &mut Ui| {
                        ui.monospace(format_shape(&layer.output_shape));
                    });
                });
            }
        });

    if let Some(name) = toggled {
        state.toggle_layer(&name);
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open image folder…").clicked() {
                open_folder_dialog(state);
                ui.close_menu();
            }
            if ui.button("Open model…").clicked() {
                open_model_dialog(state);
                ui.close_menu();
            }
            ui.separator();
            let can_export = state.views.iter().any(|v| v.grid.is_some());
            if ui
                .add_enabled(can_export, egui::Button::new("Export activations…"))
                .clicked()
            {
                export_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(seq) = &state.sequence {
            ui.label(format!("{} frames", seq.len()));
        }
        if !state.layers.is_empty() {
            ui.label(format!(
                "{} layers, {} shown",
                state.layers.len(),
                state.selected_layers.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_folder_dialog(state: &mut AppState) {
    let Some(dir) = rfd::FileDialog::new()
        .set_title("Open image sequence folder")
        .pick_folder()
    else {
        return;
    };

    match load_images(&dir, &state.settings.naming) {
        Ok(sequence) => {
            log::info!("Loaded {} frames from {}", sequence.len(), dir.display());
            state.set_sequence(dir, sequence);
        }
        Err(e) => state.report(e.context("loading image folder")),
    }
}

pub fn open_model_dialog(state: &mut AppState) {
    let Some(path) = rfd::FileDialog::new()
        .set_title("Open model")
        .add_filter("Model description", &["json"])
        .pick_file()
    else {
        return;
    };

    match Sequential::load(&path) {
        Ok(model) => {
            log::info!(
                "Loaded model {} with input {}",
                path.display(),
                format_shape(model.input_shape())
            );
            state.set_model(model);
        }
        Err(e) => {
            let context = format!("loading {}", path.display());
            state.report(anyhow::Error::new(e).context(context));
        }
    }
}

pub fn export_dialog(state: &mut AppState) {
    let Some(dir) = rfd::FileDialog::new()
        .set_title("Export activations to folder")
        .pick_folder()
    else {
        return;
    };

    match state.export_views(&dir) {
        Ok(n) => {
            state.status_message = None;
            log::info!("Wrote {n} file(s) to {}", dir.display());
        }
        Err(e) => state.report(e.context("exporting activations")),
    }
}
