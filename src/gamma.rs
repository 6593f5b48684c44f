// Linear-light accumulation for additive particles, encoded to sRGB once per
// frame through lookup tables instead of powf per pixel.
// Visual: overlapping glows brighten smoothly instead of clipping into flat
// blobs, and the background colour comes out exactly as specified.
use crate::error::{Error, Result};
use crate::types::FrameBuffer;

const ENCODE_STEPS: usize = 4096;

pub struct SrgbLut {
    // sRGB byte -> linear 0..1
    decode: [f32; 256],
    // linear 0..1 quantized to 4096 steps -> sRGB byte
    encode: [u8; ENCODE_STEPS],
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) }
}

impl SrgbLut {
    pub fn new() -> Self {
        let decode: [f32; 256] = std::array::from_fn(|v| srgb_to_linear(v as f32 / 255.0));

        // Each step maps to the byte whose decoded value is nearest, so a
        // byte that is decoded and encoded again comes back unchanged.
        let encode: [u8; ENCODE_STEPS] = std::array::from_fn(|i| {
            let l = i as f32 / (ENCODE_STEPS - 1) as f32;
            match decode.partition_point(|&d| d < l) {
                0 => 0,
                256 => 255,
                hi if l - decode[hi - 1] <= decode[hi] - l => (hi - 1) as u8,
                hi => hi as u8,
            }
        });

        Self { decode, encode }
    }

    #[inline]
    pub fn to_linear(&self, v: u8) -> f32 {
        self.decode[v as usize]
    }

    #[inline]
    pub fn to_srgb(&self, l: f32) -> u8 {
        let idx = (l.clamp(0.0, 1.0) * (ENCODE_STEPS - 1) as f32).round() as usize;
        self.encode[idx]
    }

    /// 0x00RRGGBB -> linear RGB.
    pub fn unpack(&self, rgb: u32) -> [f32; 3] {
        [
            self.to_linear(((rgb >> 16) & 0xFF) as u8),
            self.to_linear(((rgb >> 8) & 0xFF) as u8),
            self.to_linear((rgb & 0xFF) as u8),
        ]
    }
}

impl Default for SrgbLut {
    fn default() -> Self {
        Self::new()
    }
}

/// Frame-sized linear RGB accumulator. Everything the render stage emits is
/// added here; `resolve` writes the window buffer.
pub struct LightCanvas {
    pub width: usize,
    pub height: usize,
    light: Vec<[f32; 3]>,
}

impl LightCanvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, light: vec![[0.0; 3]; width * height] }
    }

    pub fn clear(&mut self, color: [f32; 3]) {
        self.light.fill(color);
    }

    /// Additive write; off-canvas pixels are ignored.
    #[inline]
    pub fn add(&mut self, x: i32, y: i32, rgb: [f32; 3]) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let px = &mut self.light[y as usize * self.width + x as usize];
        px[0] += rgb[0];
        px[1] += rgb[1];
        px[2] += rgb[2];
    }

    /// Encode to 0x00RRGGBB with saturation at white.
    pub fn resolve(&self, lut: &SrgbLut, out: &mut FrameBuffer) -> Result<()> {
        if out.width != self.width || out.height != self.height {
            return Err(Error::DimensionMismatch("resolve: canvas ↔ framebuffer".into()));
        }
        for (dst, l) in out.pixels.iter_mut().zip(&self.light) {
            let r = lut.to_srgb(l[0]) as u32;
            let g = lut.to_srgb(l[1]) as u32;
            let b = lut.to_srgb(l[2]) as u32;
            *dst = (r << 16) | (g << 8) | b;
        }
        Ok(())
    }
}
