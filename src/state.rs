use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::RgbImage;
use ndarray::Array2;

use crate::activations::{get_activations, LayerSelection};
use crate::colormap::Colormap;
use crate::config::Settings;
use crate::data::model::ImageSequence;
use crate::model::{LayerInfo, Model, Sequential};
use crate::render::activation::activation_grid;
use crate::sequence::SequencePlayer;

// ---------------------------------------------------------------------------
// LayerView – one rendered activation map
// ---------------------------------------------------------------------------

/// The rendered activation of one layer for the current frame.
#[derive(Debug, Clone)]
pub struct LayerView {
    pub name: String,
    pub shape: Vec<usize>,
    /// Laid-out activation values; `None` if the layout failed.
    pub grid: Option<Array2<f32>>,
    pub image: Option<RgbImage>,
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub settings: Settings,

    /// Loaded frames (None until user opens a folder).
    pub sequence: Option<ImageSequence>,
    pub sequence_dir: Option<PathBuf>,

    /// Loaded model and its layer summary.
    pub model: Option<Sequential>,
    pub layers: Vec<LayerInfo>,

    /// Names of the layers whose activations are shown.
    pub selected_layers: BTreeSet<String>,

    /// Index of the frame on screen.
    pub current_frame: usize,

    /// Active playback, if any.
    pub player: Option<SequencePlayer>,

    /// Activation maps of the current frame, in model layer order.
    pub views: Vec<LayerView>,

    /// Bumped whenever the frame or the views change, so textures can be
    /// re-uploaded lazily.
    pub revision: u64,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            sequence: None,
            sequence_dir: None,
            model: None,
            layers: Vec::new(),
            selected_layers: BTreeSet::new(),
            current_frame: 0,
            player: None,
            views: Vec::new(),
            revision: 0,
            status_message: None,
        }
    }

    /// Ingest a newly loaded image sequence and show its first frame.
    pub fn set_sequence(&mut self, dir: PathBuf, sequence: ImageSequence) {
        self.sequence = Some(sequence);
        self.sequence_dir = Some(dir);
        self.current_frame = 0;
        self.player = None;
        self.refresh();
    }

    /// Ingest a newly loaded model. All layers start selected.
    pub fn set_model(&mut self, model: Sequential) {
        self.layers = model.layers();
        self.selected_layers = self.layers.iter().map(|l| l.name.clone()).collect();
        self.model = Some(model);
        self.refresh();
    }

    pub fn toggle_layer(&mut self, name: &str) {
        if !self.selected_layers.remove(name) {
            self.selected_layers.insert(name.to_string());
        }
        self.refresh();
    }

    pub fn set_colormap(&mut self, cmap: Colormap) {
        if self.settings.figure.cmap != cmap {
            self.settings.figure.cmap = cmap;
            self.refresh();
        }
    }

    pub fn set_frame(&mut self, index: usize) {
        let len = self.sequence.as_ref().map_or(0, ImageSequence::len);
        let index = index.min(len.saturating_sub(1));
        if index != self.current_frame {
            self.current_frame = index;
            self.refresh();
        }
    }

    pub fn current_image(&self) -> Option<&RgbImage> {
        self.sequence.as_ref()?.frame(self.current_frame)
    }

    // -- playback --

    /// Start playing the configured range, clamped to the sequence.
    pub fn start_playback(&mut self) {
        let len = self.sequence.as_ref().map_or(0, ImageSequence::len);
        let end = self.settings.sequence_end.min(len);
        let start = self.settings.sequence_start.min(end);
        match SequencePlayer::new(len, start, end) {
            Ok(player) => {
                if let Some(i) = player.current() {
                    self.player = Some(player);
                    self.set_frame(i);
                }
            }
            Err(e) => self.report(e.context("starting playback")),
        }
    }

    pub fn stop_playback(&mut self) {
        self.player = None;
    }

    pub fn is_playing(&self) -> bool {
        self.player.is_some()
    }

    /// Show the next frame of the running playback, stopping at its end.
    pub fn tick(&mut self) {
        let Some(player) = self.player.as_mut() else {
            return;
        };
        match player.advance() {
            Some(i) => self.set_frame(i),
            None => {
                log::debug!("Playback finished at frame {}", self.current_frame);
                self.player = None;
            }
        }
    }

    // -- activations --

    /// Recompute the activation views for the current frame. A successful
    /// refresh clears any earlier error from the status line.
    pub fn refresh(&mut self) {
        self.revision += 1;
        self.views.clear();
        match self.compute_views() {
            Ok(()) => self.status_message = None,
            Err(e) => self.report(e),
        }
    }

    fn compute_views(&mut self) -> Result<()> {
        let (Some(model), Some(sequence)) = (&self.model, &self.sequence) else {
            return Ok(());
        };
        if self.selected_layers.is_empty() || sequence.is_empty() {
            return Ok(());
        }

        let input = sequence.frame_tensor(self.current_frame, self.settings.channel_order)?;
        let names: Vec<String> = self
            .layers
            .iter()
            .filter(|l| self.selected_layers.contains(&l.name))
            .map(|l| l.name.clone())
            .collect();
        let maps = get_activations(model, input, LayerSelection::Named(names.clone()), false)
            .with_context(|| format!("evaluating frame {}", self.current_frame))?;

        let cmap = self.settings.figure.cmap;
        self.views = names
            .into_iter()
            .zip(maps)
            .map(|(name, map)| {
                let shape = map.shape().to_vec();
                match activation_grid(&map) {
                    Ok(grid) => LayerView {
                        name,
                        shape,
                        image: Some(cmap.apply(&grid)),
                        grid: Some(grid),
                        error: None,
                    },
                    Err(e) => LayerView {
                        name,
                        shape,
                        grid: None,
                        image: None,
                        error: Some(e.to_string()),
                    },
                }
            })
            .collect();
        Ok(())
    }

    /// Write every rendered layer of the current frame into `dir`.
    pub fn export_views(&self, dir: &Path) -> Result<usize> {
        let mut count = 0;
        for view in &self.views {
            if let Some(grid) = &view.grid {
                let written = crate::export::export_layer(dir, &view.name, grid, &self.settings)?;
                count += written.len();
            }
        }
        Ok(count)
    }

    /// Log an error and show it in the status line.
    pub fn report(&mut self, err: anyhow::Error) {
        log::error!("{err:#}");
        self.status_message = Some(format!("Error: {err:#}"));
    }
}
