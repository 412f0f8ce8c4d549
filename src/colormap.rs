use std::fmt;
use std::str::FromStr;

use image::{Rgb, RgbImage};
use ndarray::Array2;
use palette::{Mix, Srgb};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Colour stop tables
// ---------------------------------------------------------------------------

/// `(position, sRGB)` anchors sampled from the matplotlib colormaps.
type Stops = &'static [(f32, [u8; 3])];

const INFERNO: Stops = &[
    (0.000, [0x00, 0x00, 0x04]),
    (0.125, [0x1f, 0x0c, 0x48]),
    (0.250, [0x55, 0x0f, 0x6d]),
    (0.375, [0x88, 0x22, 0x6a]),
    (0.500, [0xba, 0x36, 0x55]),
    (0.625, [0xe3, 0x59, 0x33]),
    (0.750, [0xf9, 0x8c, 0x0a]),
    (0.875, [0xf9, 0xc9, 0x32]),
    (1.000, [0xfc, 0xff, 0xa4]),
];

const MAGMA: Stops = &[
    (0.000, [0x00, 0x00, 0x04]),
    (0.125, [0x1c, 0x10, 0x44]),
    (0.250, [0x4f, 0x12, 0x7b]),
    (0.375, [0x81, 0x25, 0x81]),
    (0.500, [0xb5, 0x36, 0x7a]),
    (0.625, [0xe5, 0x59, 0x64]),
    (0.750, [0xfb, 0x87, 0x61]),
    (0.875, [0xfe, 0xc2, 0x87]),
    (1.000, [0xfc, 0xfd, 0xbf]),
];

const PLASMA: Stops = &[
    (0.000, [0x0d, 0x08, 0x87]),
    (0.125, [0x4c, 0x02, 0xa1]),
    (0.250, [0x7e, 0x03, 0xa8]),
    (0.375, [0xa9, 0x23, 0x95]),
    (0.500, [0xcc, 0x47, 0x78]),
    (0.625, [0xe5, 0x6b, 0x5d]),
    (0.750, [0xf8, 0x94, 0x41]),
    (0.875, [0xfd, 0xc3, 0x28]),
    (1.000, [0xf0, 0xf9, 0x21]),
];

const VIRIDIS: Stops = &[
    (0.000, [0x44, 0x01, 0x54]),
    (0.125, [0x47, 0x2c, 0x7a]),
    (0.250, [0x3b, 0x51, 0x8b]),
    (0.375, [0x2c, 0x71, 0x8e]),
    (0.500, [0x21, 0x90, 0x8d]),
    (0.625, [0x27, 0xad, 0x81]),
    (0.750, [0x5c, 0xc8, 0x63]),
    (0.875, [0xaa, 0xdc, 0x32]),
    (1.000, [0xfd, 0xe7, 0x25]),
];

const GRAY: Stops = &[(0.0, [0, 0, 0]), (1.0, [255, 255, 255])];

const HOT: Stops = &[
    (0.000, [0x0b, 0x00, 0x00]),
    (0.365, [0xff, 0x00, 0x00]),
    (0.746, [0xff, 0xff, 0x00]),
    (1.000, [0xff, 0xff, 0xff]),
];

// ---------------------------------------------------------------------------
// Colormap
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
#[error("unknown colormap '{0}'")]
pub struct UnknownColormap(pub String);

/// Scalar → colour maps, named as in matplotlib.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Colormap {
    #[default]
    Inferno,
    Magma,
    Plasma,
    Viridis,
    Gray,
    Hot,
}

impl Colormap {
    pub const ALL: [Colormap; 6] = [
        Colormap::Inferno,
        Colormap::Magma,
        Colormap::Plasma,
        Colormap::Viridis,
        Colormap::Gray,
        Colormap::Hot,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Colormap::Inferno => "inferno",
            Colormap::Magma => "magma",
            Colormap::Plasma => "plasma",
            Colormap::Viridis => "viridis",
            Colormap::Gray => "gray",
            Colormap::Hot => "hot",
        }
    }

    fn stops(self) -> Stops {
        match self {
            Colormap::Inferno => INFERNO,
            Colormap::Magma => MAGMA,
            Colormap::Plasma => PLASMA,
            Colormap::Viridis => VIRIDIS,
            Colormap::Gray => GRAY,
            Colormap::Hot => HOT,
        }
    }

    /// Colour for `t` in `[0, 1]`. Out-of-range values are clamped and NaN
    /// takes the lowest colour.
    pub fn map(self, t: f32) -> Rgb<u8> {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let stops = self.stops();

        let upper = stops
            .iter()
            .position(|(pos, _)| *pos >= t)
            .unwrap_or(stops.len() - 1)
            .max(1);
        let (p0, c0) = stops[upper - 1];
        let (p1, c1) = stops[upper];
        let f = if p1 > p0 { (t - p0) / (p1 - p0) } else { 0.0 };

        let a: Srgb<f32> = Srgb::new(c0[0], c0[1], c0[2]).into_format();
        let b: Srgb<f32> = Srgb::new(c1[0], c1[1], c1[2]).into_format();
        let out: Srgb<u8> = a.mix(b, f).into_format();
        Rgb([out.red, out.green, out.blue])
    }

    /// Colour every element of a 2-D array, autoscaled to its finite range.
    pub fn apply(self, values: &Array2<f32>) -> RgbImage {
        let (rows, cols) = values.dim();
        let (lo, hi) = finite_range(values.iter().copied());
        let span = hi - lo;

        RgbImage::from_fn(cols as u32, rows as u32, |x, y| {
            let v = values[[y as usize, x as usize]];
            let t = if span > 0.0 { (v - lo) / span } else { 0.0 };
            self.map(t)
        })
    }
}

/// `(min, max)` over the finite values, `(0, 0)` when there are none.
pub fn finite_range(values: impl Iterator<Item = f32>) -> (f32, f32) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if lo > hi { (0.0, 0.0) } else { (lo, hi) }
}

impl fmt::Display for Colormap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Colormap {
    type Err = UnknownColormap;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let lower = if lower == "grey" {
            "gray".to_string()
        } else {
            lower
        };
        Colormap::ALL
            .into_iter()
            .find(|c| c.name() == lower)
            .ok_or_else(|| UnknownColormap(s.to_string()))
    }
}

impl serde::Serialize for Colormap {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> serde::Deserialize<'de> for Colormap {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn endpoints_match_stop_tables() {
        assert_eq!(Colormap::Inferno.map(0.0).0, [0x00, 0x00, 0x04]);
        assert_eq!(Colormap::Inferno.map(1.0).0, [0xfc, 0xff, 0xa4]);
        assert_eq!(Colormap::Viridis.map(0.5).0, [0x21, 0x90, 0x8d]);
        assert_eq!(Colormap::Gray.map(1.0).0, [255, 255, 255]);
    }

    #[test]
    fn interpolates_between_stops() {
        let mid = Colormap::Gray.map(0.5).0;
        assert!(mid.iter().all(|&c| (127..=128).contains(&c)));
    }

    #[test]
    fn mixes_neighbouring_stops_in_srgb() {
        // Halfway between the first two hot stops.
        let c = Colormap::Hot.map(0.1825).0;
        assert!((133..=134).contains(&c[0]));
        assert_eq!(&c[1..], &[0, 0]);
    }

    #[test]
    fn out_of_range_and_nan_are_clamped() {
        assert_eq!(Colormap::Hot.map(-3.0), Colormap::Hot.map(0.0));
        assert_eq!(Colormap::Hot.map(7.0), Colormap::Hot.map(1.0));
        assert_eq!(Colormap::Magma.map(f32::NAN), Colormap::Magma.map(0.0));
    }

    #[test]
    fn names_round_trip_through_from_str() {
        for cmap in Colormap::ALL {
            assert_eq!(cmap.to_string().parse::<Colormap>().unwrap(), cmap);
        }
        assert_eq!("Inferno".parse::<Colormap>().unwrap(), Colormap::Inferno);
        assert_eq!("grey".parse::<Colormap>().unwrap(), Colormap::Gray);
        assert!("jet".parse::<Colormap>().is_err());
    }

    #[test]
    fn apply_autoscales_and_lays_out_rows() {
        let img = Colormap::Gray.apply(&array![[0.0_f32, 2.0, 4.0]]);
        assert_eq!(img.dimensions(), (3, 1));
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(img.get_pixel(2, 0).0, [255, 255, 255]);
    }

    #[test]
    fn finite_range_ignores_non_finite() {
        let r = finite_range([1.0, f32::NAN, -2.0, f32::INFINITY].into_iter());
        assert_eq!(r, (-2.0, 1.0));
        assert_eq!(finite_range(std::iter::empty()), (0.0, 0.0));
    }
}
