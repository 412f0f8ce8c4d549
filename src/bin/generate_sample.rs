use std::path::Path;

use image::{Rgb, RgbImage};
use rusty_lens::model::layer::LayerSpec;
use rusty_lens::model::sequential::ModelSpec;

const WIDTH: u32 = 64;
const HEIGHT: u32 = 48;
const FRAMES: usize = 30;

fn gaussian(d2: f64, sigma: f64) -> f64 {
    (-d2 / (2.0 * sigma.powi(2))).exp()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    fn weights(&mut self, n: usize, scale: f64) -> Vec<f32> {
        (0..n).map(|_| self.gauss(0.0, scale) as f32).collect()
    }
}

/// A warm blob travelling left to right over a cool, noisy background.
fn render_frame(i: usize, rng: &mut SimpleRng) -> RgbImage {
    let t = i as f64 / (FRAMES - 1) as f64;
    let cx = 8.0 + t * (WIDTH as f64 - 16.0);
    let cy = HEIGHT as f64 / 2.0 + 10.0 * (t * std::f64::consts::TAU).sin();

    RgbImage::from_fn(WIDTH, HEIGHT, |x, y| {
        let d2 = (x as f64 - cx).powi(2) + (y as f64 - cy).powi(2);
        let blob = gaussian(d2, 5.0);
        let noise = rng.gauss(0.0, 8.0);
        let channel = |base: f64, gain: f64| (base + gain * blob + noise).clamp(0.0, 255.0) as u8;
        Rgb([
            channel(30.0, 220.0),
            channel(40.0, 150.0),
            channel(90.0, -60.0),
        ])
    })
}

fn sample_model(rng: &mut SimpleRng) -> ModelSpec {
    let h = HEIGHT as usize;
    let w = WIDTH as usize;
    // conv 3x3 → pool 2 → conv 3x3 → pool 2
    let flat = ((h - 2) / 2 - 2) / 2 * (((w - 2) / 2 - 2) / 2) * 4;

    ModelSpec {
        input_shape: vec![h, w, 3],
        layers: vec![
            LayerSpec::Conv2d {
                name: Some("block1_conv".into()),
                filters: 8,
                kernel_size: [3, 3],
                strides: [1, 1],
                kernel: rng.weights(3 * 3 * 3 * 8, 0.3),
                bias: Some(vec![0.0; 8]),
            },
            LayerSpec::Relu { name: None },
            LayerSpec::MaxPool2d {
                name: None,
                pool_size: [2, 2],
            },
            LayerSpec::Conv2d {
                name: Some("block2_conv".into()),
                filters: 4,
                kernel_size: [3, 3],
                strides: [1, 1],
                kernel: rng.weights(3 * 3 * 8 * 4, 0.2),
                bias: None,
            },
            LayerSpec::Relu { name: None },
            LayerSpec::MaxPool2d {
                name: None,
                pool_size: [2, 2],
            },
            LayerSpec::Flatten { name: None },
            LayerSpec::Dropout {
                name: None,
                rate: 0.25,
            },
            LayerSpec::Dense {
                name: Some("fc".into()),
                units: 16,
                kernel: rng.weights(flat * 16, 0.05),
                bias: None,
            },
            LayerSpec::Relu { name: None },
            LayerSpec::Dense {
                name: Some("logits".into()),
                units: 4,
                kernel: rng.weights(16 * 4, 0.3),
                bias: None,
            },
            LayerSpec::Softmax {
                name: Some("predictions".into()),
            },
        ],
    }
}

fn main() {
    let mut rng = SimpleRng::new(42);

    let frames_dir = Path::new("sample_frames");
    std::fs::create_dir_all(frames_dir).expect("Failed to create frame directory");
    for i in 0..FRAMES {
        let path = frames_dir.join(format!("frame{i}.jpg"));
        render_frame(i, &mut rng)
            .save(&path)
            .expect("Failed to write frame");
    }

    let model_path = "sample_model.json";
    let json = serde_json::to_string_pretty(&sample_model(&mut rng))
        .expect("Failed to serialize model");
    std::fs::write(model_path, json).expect("Failed to write model");

    println!(
        "Wrote {FRAMES} frames ({WIDTH}x{HEIGHT}) to {} and a model to {model_path}",
        frames_dir.display()
    );
}
