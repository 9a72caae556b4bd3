//! Waterfall color lookup table.
//!
//! Maps a one-byte magnitude level to a display color through a fixed
//! piecewise-linear gradient. Built once at startup and shared read-only by
//! every render pass.

/// One RGBA pixel, full opacity for every LUT entry.
pub type Rgba = [u8; 4];

/// Gradient stops, coldest to hottest. Interpolation is linear per channel
/// between adjacent stops, giving five segments of 51 levels each.
const STOPS: [(u8, [u8; 3]); 6] = [
    (0, [0, 0, 64]),      // deep blue
    (51, [0, 0, 255]),    // blue
    (102, [0, 255, 255]), // cyan
    (153, [0, 255, 0]),   // green
    (204, [255, 255, 0]), // yellow
    (255, [255, 0, 0]),   // red
];

/// Precomputed 256-entry color table for magnitude bytes.
pub struct ColorLut {
    entries: [Rgba; 256],
}

impl ColorLut {
    /// Color for a magnitude level. Total over the full u8 range.
    pub fn color(&self, level: u8) -> Rgba {
        self.entries[level as usize]
    }

    pub fn entries(&self) -> &[Rgba; 256] {
        &self.entries
    }
}

/// Build the lookup table. Pure function of the fixed gradient stops.
pub fn build_color_lut() -> ColorLut {
    let mut entries = [[0u8; 4]; 256];
    for (i, entry) in entries.iter_mut().enumerate() {
        let rgb = gradient(i as u8);
        *entry = [rgb[0], rgb[1], rgb[2], 255];
    }
    ColorLut { entries }
}

fn gradient(level: u8) -> [u8; 3] {
    // Find the segment containing `level` and interpolate within it.
    for window in STOPS.windows(2) {
        let (lo_pos, lo_rgb) = window[0];
        let (hi_pos, hi_rgb) = window[1];
        if level <= hi_pos {
            let span = (hi_pos - lo_pos) as f32;
            let t = (level - lo_pos) as f32 / span;
            return [
                lerp(lo_rgb[0], hi_rgb[0], t),
                lerp(lo_rgb[1], hi_rgb[1], t),
                lerp(lo_rgb[2], hi_rgb[2], t),
            ];
        }
    }
    STOPS[STOPS.len() - 1].1
}

fn lerp(a: u8, b: u8, t: f32) -> u8 {
    (a as f32 + (b as f32 - a as f32) * t).round() as u8
}
