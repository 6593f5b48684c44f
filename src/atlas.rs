// Stacks every image's particle layout into one float "texture".
// Visual: nothing by itself; the render stage reads two rows of it per frame
// and blends between them to morph one outline into the next.
use crate::config::{PARTICLE_COUNT, WORLD_SPAN};
use crate::error::{Error, Result};
use crate::types::{ShapeSample, Texel};

/// Normalized row coordinate of an image's texel row. The 0.5 puts the sample
/// at the centre of the row, strictly inside (i/N, (i+1)/N).
#[inline]
pub fn row_v(image_index: usize, total_images: usize) -> f32 {
    (image_index as f32 + 0.5) / total_images as f32
}

/// Normalized column coordinate of a particle slot.
#[inline]
pub fn column_u(slot: usize, particle_count: usize) -> f32 {
    (slot as f32 + 0.5) / particle_count as f32
}

/// `PARTICLE_COUNT × total_images` RGBA32F grid, row-major by image.
/// Built once, never written again.
#[derive(Debug)]
pub struct Atlas {
    data: Vec<f32>,
    total_images: usize,
}

impl Atlas {
    /// Concatenate samples in the given order. At least one sample is required.
    pub fn from_samples(samples: &[ShapeSample]) -> Result<Self> {
        if samples.is_empty() {
            return Err(Error::DimensionMismatch("atlas needs at least one image".into()));
        }
        let mut data = Vec::with_capacity(PARTICLE_COUNT * samples.len() * 4);
        for (i, sample) in samples.iter().enumerate() {
            if sample.len() != PARTICLE_COUNT {
                return Err(Error::DimensionMismatch(format!(
                    "sample {i} has {} slots, expected {PARTICLE_COUNT}",
                    sample.len()
                )));
            }
            data.extend(sample.texels().iter().flatten());
        }
        Ok(Self { data, total_images: samples.len() })
    }

    pub fn total_images(&self) -> usize {
        self.total_images
    }

    pub fn width(&self) -> usize {
        PARTICLE_COUNT
    }

    /// Raw floats, `width × total_images × 4`.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Direct cell read by (slot, image).
    pub fn texel(&self, slot: usize, image_index: usize) -> Texel {
        let base = (image_index * PARTICLE_COUNT + slot) * 4;
        [self.data[base], self.data[base + 1], self.data[base + 2], self.data[base + 3]]
    }

    /// Nearest-filtered lookup by normalized coordinates, the way a shader
    /// would fetch it. Coordinates are clamped to the edge.
    pub fn sample(&self, u: f32, v: f32) -> Texel {
        let x = nearest(u, PARTICLE_COUNT);
        let y = nearest(v, self.total_images);
        self.texel(x, y)
    }
}

#[inline]
fn nearest(coord: f32, size: usize) -> usize {
    let i = (coord * size as f32).floor();
    if i < 0.0 { 0 } else { (i as usize).min(size - 1) }
}

/// Downsampled silhouette masks, one `res × res` layer per atlas row, plus
/// each image's aspect so world points can be mapped back into mask space.
#[derive(Debug)]
pub struct MaskAtlas {
    res: usize,
    bits: Vec<u8>,
    aspects: Vec<f32>,
}

impl MaskAtlas {
    pub fn resolution(&self) -> usize {
        self.res
    }

    pub fn total_images(&self) -> usize {
        self.aspects.len()
    }

    /// 1.0 inside the silhouette, 0.0 outside or off the image.
    pub fn coverage_at_world(&self, image_index: usize, x: f32, y: f32) -> f32 {
        let Some(&aspect) = self.aspects.get(image_index) else { return 0.0 };
        let u = x / (WORLD_SPAN * aspect) + 0.5;
        let v = 0.5 - y / WORLD_SPAN;
        if !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
            return 0.0;
        }
        let i = ((u * self.res as f32) as usize).min(self.res - 1);
        let j = ((v * self.res as f32) as usize).min(self.res - 1);
        let layer = image_index * self.res * self.res;
        f32::from(self.bits[layer + j * self.res + i])
    }
}

/// One processed image waiting to be stacked.
pub struct AtlasEntry {
    /// Position in the manifest; decides the row.
    pub order: usize,
    pub sample: ShapeSample,
    /// `res × res` downsampled mask.
    pub mask: Vec<u8>,
    pub aspect: f32,
}

/// Collects entries in whatever order they finish, then lays rows out by
/// manifest order.
pub struct AtlasBuilder {
    mask_res: usize,
    entries: Vec<AtlasEntry>,
}

impl AtlasBuilder {
    pub fn new(mask_res: usize) -> Self {
        Self { mask_res, entries: Vec::new() }
    }

    pub fn push(&mut self, entry: AtlasEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `None` when nothing loaded: the caller renders nothing.
    pub fn build(mut self) -> Result<Option<(Atlas, MaskAtlas)>> {
        if self.entries.is_empty() {
            return Ok(None);
        }
        self.entries.sort_by_key(|e| e.order);

        let layer = self.mask_res * self.mask_res;
        let mut bits = Vec::with_capacity(layer * self.entries.len());
        let mut aspects = Vec::with_capacity(self.entries.len());
        let mut samples = Vec::with_capacity(self.entries.len());

        for entry in self.entries {
            if entry.mask.len() != layer {
                return Err(Error::DimensionMismatch(format!(
                    "mask for image {} has {} cells, expected {layer}",
                    entry.order,
                    entry.mask.len()
                )));
            }
            bits.extend_from_slice(&entry.mask);
            aspects.push(entry.aspect);
            samples.push(entry.sample);
        }

        let atlas = Atlas::from_samples(&samples)?;
        Ok(Some((atlas, MaskAtlas { res: self.mask_res, bits, aspects })))
    }
}
