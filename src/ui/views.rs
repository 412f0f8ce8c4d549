use eframe::egui::{self, Color32, RichText, ScrollArea, TextureHandle, Ui};
use egui_plot::{Plot, PlotImage, PlotPoint};
use image::RgbImage;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Texture cache
// ---------------------------------------------------------------------------

/// GPU textures for the current frame and activation views.
#[derive(Default)]
pub struct TextureCache {
    revision: Option<u64>,
    frame: Option<TextureHandle>,
    layers: Vec<Option<TextureHandle>>,
}

impl TextureCache {
    /// Re-upload textures if the state changed since the last frame.
    pub fn sync(&mut self, ctx: &egui::Context, state: &AppState) {
        if self.revision == Some(state.revision) {
            return;
        }
        self.revision = Some(state.revision);
        self.frame = state.current_image().and_then(|img| upload(ctx, "frame", img));
        self.layers = state
            .views
            .iter()
            .map(|v| v.image.as_ref().and_then(|img| upload(ctx, &v.name, img)))
            .collect();
    }
}

fn upload(ctx: &egui::Context, name: &str, img: &RgbImage) -> Option<TextureHandle> {
    if img.width() == 0 || img.height() == 0 {
        return None;
    }
    let size = [img.width() as usize, img.height() as usize];
    let color = egui::ColorImage::from_rgb(size, img.as_raw());
    Some(ctx.load_texture(name, color, egui::TextureOptions::NEAREST))
}

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// Render the current frame followed by each selected layer's activations.
pub fn frame_and_activations(ui: &mut Ui, state: &AppState, textures: &TextureCache) {
    let Some(sequence) = &state.sequence else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open an image folder to begin  (File → Open image folder…)");
        });
        return;
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            if let Some(tex) = &textures.frame {
                let name = sequence
                    .names
                    .get(state.current_frame)
                    .map(String::as_str)
                    .unwrap_or("");
                ui.strong(format!(
                    "Frame {} / {}  {name}",
                    state.current_frame + 1,
                    sequence.len()
                ));
                let size = tex.size_vec2();
                let scale = (ui.available_width() / size.x).clamp(0.1, 4.0);
                ui.image((tex.id(), size * scale));
            }
            ui.separator();

            if state.model.is_none() {
                ui.label("Open a model to see its activations  (File → Open model…)");
                return;
            }
            if state.views.is_empty() {
                ui.label("No layers selected.");
            }

            for (view, tex) in state.views.iter().zip(&textures.layers) {
                let header = format!("{}  {:?}", view.name, view.shape);
                egui::CollapsingHeader::new(RichText::new(header).strong())
                    .id_salt(&view.name)
                    .default_open(true)
                    .show(ui, |ui: &mut Ui| {
                        match (tex, &view.error) {
                            (_, Some(err)) => ui.colored_label(Color32::RED, err.as_str()),
                            (Some(tex), None) => activation_plot(ui, &view.name, tex),
                            (None, None) => ui.label("Nothing to display."),
                        };
                    });
            }
        });
}

/// A zoomable plot showing one activation image at one unit per value.
fn activation_plot(ui: &mut Ui, name: &str, tex: &TextureHandle) -> egui::Response {
    let [w, h] = tex.size();
    let (w, h) = (w as f64, h as f64);
    let height = (ui.available_width() as f64 * h / w).clamp(60.0, 400.0) as f32;

    Plot::new(("activation", name))
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .allow_scroll(false)
        .height(height)
        .show(ui, |plot_ui| {
            let image = PlotImage::new(
                tex.id(),
                PlotPoint::new(w / 2.0, h / 2.0),
                egui::vec2(w as f32, h as f32),
            );
            plot_ui.image(image);
        })
        .response
}
