/// Data layer: image sequences and their loading.
///
/// Architecture:
/// ```text
///   frame1.jpg, frame2.jpg, … frame10.jpg
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  filter by extension, sort by frame number, decode
///   └──────────┘
///        │
///        ▼
///   ┌───────────────┐
///   │ ImageSequence │  Vec<RgbImage>, → (N, H, W, 3) arrays / model input
///   └───────────────┘
/// ```

pub mod loader;
pub mod model;
