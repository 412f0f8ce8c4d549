use std::time::{Duration, Instant};

use eframe::egui;

use crate::config::Settings;
use crate::state::AppState;
use crate::ui::{panels, views};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct RustyLensApp {
    pub state: AppState,
    pub textures: views::TextureCache,
    last_tick: Instant,
}

impl RustyLensApp {
    pub fn new(settings: Settings) -> Self {
        Self {
            state: AppState::new(settings),
            textures: views::TextureCache::default(),
            last_tick: Instant::now(),
        }
    }
}

impl Default for RustyLensApp {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl eframe::App for RustyLensApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Playback clock ----
        if self.state.is_playing() {
            let interval = Duration::from_millis(self.state.settings.playback_interval_ms);
            if self.last_tick.elapsed() >= interval {
                self.state.tick();
                self.last_tick = Instant::now();
            }
            ctx.request_repaint_after(interval);
        }

        self.textures.sync(ctx, &self.state);

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: layers, colormap, playback ----
        egui::SidePanel::left("layer_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: frame + activation maps ----
        egui::CentralPanel::default().show(ctx, |ui| {
            views::frame_and_activations(ui, &self.state, &self.textures);
        });
    }
}
