use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::model::ImageSequence;

// ---------------------------------------------------------------------------
// Naming scheme
// ---------------------------------------------------------------------------

/// How frame files are named on disk.
///
/// The frame index is the part of the file name between byte `index_offset`
/// and the `.<extension>` suffix: with the default scheme `frame12.jpg` has
/// index 12.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingScheme {
    pub index_offset: usize,
    pub extension: String,
}

impl Default for NamingScheme {
    fn default() -> Self {
        Self {
            index_offset: 5,
            extension: "jpg".to_string(),
        }
    }
}

impl NamingScheme {
    fn suffix(&self) -> String {
        format!(".{}", self.extension)
    }

    /// Parse the frame index out of a (lowercased) file name.
    pub fn frame_index(&self, name: &str) -> Result<i64> {
        let end = name
            .len()
            .checked_sub(self.suffix().len())
            .with_context(|| format!("'{name}' is shorter than its extension"))?;
        let key = name
            .get(self.index_offset..end)
            .with_context(|| format!("'{name}' has no index at offset {}", self.index_offset))?;
        key.parse::<i64>()
            .with_context(|| format!("'{name}': '{key}' is not a frame number"))
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load every frame of a directory, sorted by frame number.
///
/// Only files whose raw name ends with `.<extension>` are picked up.
pub fn load_images(dir: &Path, scheme: &NamingScheme) -> Result<ImageSequence> {
    let files = list_frames(dir, scheme)?;

    let mut sequence = ImageSequence::default();
    for (i, (name, path)) in files.into_iter().enumerate() {
        log::debug!("Decoding frame {i}: {name}");
        let frame = image::open(&path)
            .with_context(|| format!("decoding {}", path.display()))?
            .to_rgb8();
        sequence.frames.push(frame);
        sequence.names.push(name);
    }

    log::info!("{} Images loaded", sequence.len());
    Ok(sequence)
}

/// List matching frame files as `(lowercased name, path)`, sorted by index.
fn list_frames(dir: &Path, scheme: &NamingScheme) -> Result<Vec<(String, PathBuf)>> {
    let suffix = scheme.suffix();
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("reading directory {}", dir.display()))?;

    let mut keyed = Vec::new();
    for entry in entries {
        let entry = entry.context("reading directory entry")?;
        let raw = entry.file_name();
        let Some(raw) = raw.to_str() else {
            continue;
        };
        if !raw.ends_with(&suffix) {
            continue;
        }
        let name = raw.to_lowercase();
        let index = scheme.frame_index(&name)?;
        keyed.push((index, name, entry.path()));
    }

    if keyed.is_empty() {
        log::warn!("No *{suffix} files found in {}", dir.display());
    }

    keyed.sort_by_key(|(index, _, _)| *index);
    Ok(keyed.into_iter().map(|(_, name, path)| (name, path)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_frame(dir: &Path, name: &str, shade: u8) {
        RgbImage::from_pixel(8, 6, Rgb([shade, shade, shade]))
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn frame_index_reads_number_after_offset() {
        let scheme = NamingScheme::default();
        assert_eq!(scheme.frame_index("frame12.jpg").unwrap(), 12);
        assert_eq!(scheme.frame_index("image007.jpg").unwrap(), 7);
        assert!(scheme.frame_index("frameXY.jpg").is_err());
        assert!(scheme.frame_index("a.jpg").is_err());
    }

    #[test]
    fn loads_frames_in_numeric_order() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), "frame10.jpg", 200);
        write_frame(dir.path(), "frame2.jpg", 20);
        write_frame(dir.path(), "frame1.jpg", 10);
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let seq = load_images(dir.path(), &NamingScheme::default()).unwrap();
        assert_eq!(seq.len(), 3);
        assert_eq!(seq.names, vec!["frame1.jpg", "frame2.jpg", "frame10.jpg"]);
        assert_eq!(seq.dimensions(), Some((8, 6)));
        // JPEG is lossy; only check ordering by brightness.
        let brightness: Vec<u8> = seq
            .frames
            .iter()
            .map(|f| f.get_pixel(4, 3).0[0])
            .collect();
        assert!(brightness[0] < brightness[1] && brightness[1] < brightness[2]);
    }

    #[test]
    fn uppercase_extension_is_not_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), "frame1.jpg", 10);
        write_frame(dir.path(), "frame2.JPG", 10);

        let seq = load_images(dir.path(), &NamingScheme::default()).unwrap();
        assert_eq!(seq.names, vec!["frame1.jpg"]);
    }

    #[test]
    fn unparseable_name_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), "frame1.jpg", 10);
        write_frame(dir.path(), "cover.jpg", 10);

        let err = load_images(dir.path(), &NamingScheme::default()).unwrap_err();
        assert!(format!("{err:#}").contains("cover.jpg"));
    }

    #[test]
    fn empty_directory_yields_empty_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let seq = load_images(dir.path(), &NamingScheme::default()).unwrap();
        assert!(seq.is_empty());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_images(&dir.path().join("absent"), &NamingScheme::default()).is_err());
    }
}
