use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::loader::NamingScheme;
use crate::data::model::ChannelOrder;
use crate::render::crop::CropBox;
use crate::render::figure::FigureSpec;

/// Environment variable pointing at a settings file.
pub const CONFIG_ENV: &str = "RUSTY_LENS_CONFIG";
/// Settings file picked up from the working directory.
pub const CONFIG_FILE: &str = "rusty-lens.json";

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Viewer settings. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// How frame files are named.
    pub naming: NamingScheme,
    /// Channel order the model was trained on.
    pub channel_order: ChannelOrder,
    /// Figure size, dpi and colormap for rendered activations.
    pub figure: FigureSpec,
    /// Region kept when exporting a cropped figure.
    pub crop: CropBox,
    /// First frame played.
    pub sequence_start: usize,
    /// One past the last frame played.
    pub sequence_end: usize,
    pub playback_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            naming: NamingScheme::default(),
            channel_order: ChannelOrder::Rgb,
            figure: FigureSpec::default(),
            crop: CropBox::default(),
            sequence_start: 0,
            sequence_end: 20,
            playback_interval_ms: 200,
        }
    }
}

impl Settings {
    /// Load settings from `$RUSTY_LENS_CONFIG`, then `./rusty-lens.json`,
    /// falling back to defaults when neither exists.
    pub fn load() -> Result<Self> {
        match Self::locate() {
            Some(path) => Self::from_path(&path),
            None => {
                log::debug!("No settings file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn locate() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        let local = PathBuf::from(CONFIG_FILE);
        local.exists().then_some(local)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&text)
            .with_context(|| format!("parsing settings {}", path.display()))?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colormap::Colormap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_match_notebook_constants() {
        let s = Settings::default();
        assert_eq!(s.naming.index_offset, 5);
        assert_eq!(s.figure.size, (250, 70));
        assert_eq!(s.figure.dpi, 70.0);
        assert_eq!(s.figure.cmap, Colormap::Inferno);
        assert_eq!(s.crop.rows, 700..4300);
        assert_eq!(s.crop.cols, 2500..16000);
        assert_eq!((s.sequence_start, s.sequence_end), (0, 20));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "figure": {{ "cmap": "viridis", "dpi": 100.0 }}, "channel_order": "bgr" }}"#
        )
        .unwrap();

        let s = Settings::from_path(file.path()).unwrap();
        assert_eq!(s.figure.cmap, Colormap::Viridis);
        assert_eq!(s.figure.dpi, 100.0);
        assert_eq!(s.figure.size, (250, 70));
        assert_eq!(s.channel_order, ChannelOrder::Bgr);
        assert_eq!(s.playback_interval_ms, 200);
    }

    #[test]
    fn unknown_colormap_is_reported() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "figure": {{ "cmap": "jet" }} }}"#).unwrap();
        let err = Settings::from_path(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("unknown colormap 'jet'"));
    }
}
