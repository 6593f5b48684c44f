// Core types shared by the extraction, atlas and render stages.

/// What the window shows. Each pixel is 0x00RRGGBB for minifb.
#[derive(Clone)]
pub struct FrameBuffer {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u32>,
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, pixels: vec![0u32; width * height] }
    }
}

/// Single-channel float plane (luminance, blurred luminance, gradients).
/// Values are in 0..255 for luminance planes.
#[derive(Clone, Debug)]
pub struct LumaImage {
    pub width: usize,
    pub height: usize,
    pub values: Vec<f32>, // length = width * height, row-major
}

impl LumaImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, values: vec![0.0; width * height] }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.width + x]
    }
}

/// Foreground/background segmentation; 1 = foreground, 0 = background.
#[derive(Clone, Debug, PartialEq)]
pub struct BinaryMask {
    pub width: usize,
    pub height: usize,
    pub bits: Vec<u8>,
}

impl BinaryMask {
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.bits[y * self.width + x]
    }

    pub fn foreground_count(&self) -> usize {
        self.bits.iter().filter(|&&b| b != 0).count()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ORIGIN: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Component-wise linear blend; t = 0 gives `self`, t = 1 gives `other`.
    #[inline]
    pub fn lerp(self, other: Vec3, t: f32) -> Vec3 {
        Vec3 {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            z: self.z + (other.z - self.z) * t,
        }
    }
}

/// A pixel on the silhouette contour, already mapped into world units
/// (image width spans 10 × aspect, height spans 10), with the local
/// gradient angle `atan2(gx, -gy)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundaryPoint {
    pub position: Vec3,
    pub angle: f32,
}

impl BoundaryPoint {
    /// Stand-in used when an image has no contour at all.
    pub const ORIGIN: BoundaryPoint = BoundaryPoint { position: Vec3::ORIGIN, angle: 0.0 };
}

/// One atlas cell: (x, y, z, angle), the layout uploaded per particle slot.
pub type Texel = [f32; 4];

/// Fixed-length per-image particle layout. Always holds exactly
/// `PARTICLE_COUNT` texels; slot order carries no spatial meaning.
#[derive(Clone, Debug)]
pub struct ShapeSample {
    texels: Vec<Texel>,
}

impl ShapeSample {
    pub(crate) fn from_texels(texels: Vec<Texel>) -> Self {
        Self { texels }
    }

    pub fn len(&self) -> usize {
        self.texels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texels.is_empty()
    }

    pub fn texels(&self) -> &[Texel] {
        &self.texels
    }

    pub fn position(&self, slot: usize) -> Vec3 {
        let [x, y, z, _] = self.texels[slot];
        Vec3 { x, y, z }
    }
}
