//! Load numbered image sequences, run a convolutional network over a frame,
//! and render its activation maps as colormapped pixel buffers.

pub mod activations;
pub mod app;
pub mod colormap;
pub mod config;
pub mod data;
pub mod export;
pub mod model;
pub mod render;
pub mod sequence;
pub mod state;
pub mod ui;
