// Software version of the particle + streak shaders, with additive blending.
// Visual outcomes:
// - ~3000 glowing points sit on the current outline, each pulsing in size and
//   brightness at its own rate, tinted cyan (left) to magenta (right).
// - A few hundred soft streaks shoot outward from random particles.
// - Faint horizontal scan lines fill the background but vanish inside the
//   silhouette.
// - While morphing, every particle slides from its slot in the current image
//   to the same slot in the next one.
use std::f32::consts::TAU;

use rand::Rng;

use crate::atlas::{Atlas, MaskAtlas, column_u, row_v};
use crate::config::{Config, PARTICLE_COUNT};
use crate::error::Result;
use crate::gamma::{LightCanvas, SrgbLut};
use crate::morph::{MorphCycle, smoothstep};
use crate::types::{FrameBuffer, Vec3};

/// Deep navy behind everything (#020617).
pub const BACKGROUND: u32 = 0x00_02_06_17;

const CYAN: [f32; 3] = [0.0, 1.0, 1.0];
const MAGENTA: [f32; 3] = [1.0, 0.0, 1.0];
const WHITE: [f32; 3] = [1.0, 1.0, 1.0];

const CAMERA_Z: f32 = 12.0;
const FOV_Y_DEGREES: f32 = 50.0;
const NEAR: f32 = 0.1;

const DRIFT_AMPLITUDE: f32 = 0.1;

const LINE_SPACING: usize = 6; // px between scan lines
const LINE_SPEED: f32 = 8.0; // px per second, downward
const LINE_LIGHT: [f32; 3] = [0.010, 0.030, 0.045];

// ----------------------------- per-frame inputs ------------------------------

/// What the shaders read each frame; the morph driver fills it.
#[derive(Clone, Copy, Debug)]
pub struct Uniforms {
    pub time: f32,
    /// Eased morph factor in [0, 1].
    pub blend: f32,
    pub current: usize,
    pub next: usize,
    pub total_images: usize,
    pub base_size: f32,
}

impl Uniforms {
    pub fn from_cycle(cycle: &MorphCycle, time: f32, base_size: f32) -> Self {
        Self {
            time,
            blend: cycle.blend(),
            current: cycle.current_index(),
            next: cycle.next_index(),
            total_images: cycle.total_images(),
            base_size,
        }
    }
}

// ----------------------------- camera ----------------------------------------

/// Perspective camera on +z looking at the origin.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    width: f32,
    height: f32,
    /// Pixels per world unit at distance 1.
    focal: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projected {
    pub x: f32,
    pub y: f32,
    /// Distance in front of the camera (−z in view space).
    pub depth: f32,
}

impl Camera {
    pub fn new(width: usize, height: usize) -> Self {
        let half_fov = (FOV_Y_DEGREES * 0.5).to_radians();
        Self {
            width: width as f32,
            height: height as f32,
            focal: (height as f32 * 0.5) / half_fov.tan(),
        }
    }

    pub fn project(&self, p: Vec3) -> Option<Projected> {
        let depth = CAMERA_Z - p.z;
        if depth <= NEAR {
            return None;
        }
        Some(Projected {
            x: self.width * 0.5 + p.x * self.focal / depth,
            y: self.height * 0.5 - p.y * self.focal / depth,
            depth,
        })
    }

    /// World (x, y) on the z = 0 plane under a screen pixel.
    pub fn unproject_ground(&self, sx: f32, sy: f32) -> (f32, f32) {
        ((sx - self.width * 0.5) * CAMERA_Z / self.focal, (self.height * 0.5 - sy) * CAMERA_Z / self.focal)
    }

    /// World length at `depth` expressed in pixels.
    pub fn pixels_per_unit(&self, depth: f32) -> f32 {
        self.focal / depth
    }
}

// ----------------------------- shared shader helpers -------------------------

#[inline]
fn mix3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t, a[2] + (b[2] - a[2]) * t]
}

#[inline]
fn scale3(c: [f32; 3], s: f32) -> [f32; 3] {
    [c[0] * s, c[1] * s, c[2] * s]
}

/// Cyan on the left, magenta on the right, across the 10-unit span.
pub fn palette(x: f32) -> [f32; 3] {
    mix3(CYAN, MAGENTA, smoothstep(-5.0, 5.0, x))
}

/// Morphed atlas position for a slot: the current row blended into the next.
pub fn morphed_position(atlas: &Atlas, u: &Uniforms, slot: usize) -> Vec3 {
    let col = column_u(slot, PARTICLE_COUNT);
    let start = atlas.sample(col, row_v(u.current, u.total_images));
    let end = atlas.sample(col, row_v(u.next, u.total_images));
    let start = Vec3::new(start[0], start[1], start[2]);
    let end = Vec3::new(end[0], end[1], end[2]);
    start.lerp(end, u.blend)
}

/// Per-particle oscillation in [-0.4, 1.0]; `random` in [0, 1) sets both the
/// rate and the phase.
#[inline]
pub fn pulse(time: f32, random: f32) -> f32 {
    let speed = 1.5 + random * 2.0;
    0.3 + 0.7 * (time * speed + random * TAU).sin()
}

// ----------------------------- particles -------------------------------------

#[derive(Clone, Copy, Debug)]
pub struct ParticleVertex {
    pub position: Vec3,
    pub color: [f32; 3],
    pub alpha: f32,
    pub pulse: f32,
    /// Point size before perspective division.
    pub size: f32,
}

/// Vertex stage for one particle slot.
pub fn particle_vertex(atlas: &Atlas, u: &Uniforms, slot: usize, random: f32) -> ParticleVertex {
    let mut position = morphed_position(atlas, u, slot);
    position.z += (u.time + position.x * 2.0 + random * TAU).sin() * DRIFT_AMPLITUDE;

    let p = pulse(u.time, random);
    ParticleVertex {
        position,
        color: palette(position.x),
        alpha: (0.4 + 0.6 * p).max(0.0),
        pulse: p,
        size: (u.base_size * (0.3 + 0.7 * p)).max(0.0),
    }
}

/// Fragment stage: `d` is the distance from the point centre in point
/// coordinates (0 at centre, 0.5 at the rim). Returns the light to add, or
/// `None` outside the disc.
pub fn particle_fragment(v: &ParticleVertex, d: f32) -> Option<[f32; 3]> {
    if d > 0.5 {
        return None;
    }
    let core_brightness = 0.5 + 0.5 * v.pulse;
    let core = mix3(v.color, WHITE, (0.5 - d) * core_brightness);
    let intensity = (1.0 - d * 2.0).max(0.0).powf(1.5);
    let boost = 1.0 + v.pulse * 0.3;
    Some(scale3(core, boost * v.alpha * intensity))
}

// ----------------------------- streaks ---------------------------------------

#[derive(Clone, Copy, Debug)]
pub struct StreakGeometry {
    pub start: Vec3,
    pub end: Vec3,
    pub color: [f32; 3],
    /// Alpha at the particle end; fades by 70% towards the tip.
    pub alpha: f32,
    /// Half-width in world units.
    pub half_width: f32,
}

/// Vertex stage for a streak anchored at `slot`.
pub fn streak_geometry(atlas: &Atlas, u: &Uniforms, slot: usize, random: f32, length: f32, half_width: f32) -> StreakGeometry {
    let mut anchor = morphed_position(atlas, u, slot);
    anchor.z += (u.time + anchor.x * 2.0 + random * TAU).sin() * DRIFT_AMPLITUDE;

    let r = (anchor.x * anchor.x + anchor.y * anchor.y).sqrt();
    let (dx, dy) = if r < 0.01 { (1.0, 0.0) } else { (anchor.x / r, anchor.y / r) };

    let pulse = 0.7 + 0.8 * (u.time * 2.0 + random * TAU).sin();
    let len = length * pulse;

    StreakGeometry {
        start: anchor,
        end: Vec3::new(anchor.x + dx * len, anchor.y + dy * len, anchor.z),
        color: mix3(palette(anchor.x), WHITE, 0.3),
        alpha: (0.8 * pulse).max(0.0),
        half_width,
    }
}

/// Fragment stage: `along` 0 at the particle, 1 at the tip; `side` −1..1
/// across the width.
pub fn streak_fragment(g: &StreakGeometry, along: f32, side: f32) -> [f32; 3] {
    let edge = 1.0 - smoothstep(0.5, 1.0, side.abs());
    let fade = 1.0 - along * 0.7;
    scale3(g.color, g.alpha * fade * edge)
}

// ----------------------------- per-visual attributes -------------------------

/// Fixed random attributes: a phase per particle slot, and each streak's
/// slot + phase. Drawn once when the visual starts.
pub struct ParticleField {
    randoms: Vec<f32>,
    streaks: Vec<(usize, f32)>,
}

impl ParticleField {
    pub fn new<R: Rng + ?Sized>(rng: &mut R, streak_count: usize) -> Self {
        let randoms = (0..PARTICLE_COUNT).map(|_| rng.gen_range(0.0..1.0)).collect();
        let streaks = (0..streak_count)
            .map(|_| (rng.gen_range(0..PARTICLE_COUNT), rng.gen_range(0.0..1.0)))
            .collect();
        Self { randoms, streaks }
    }

    pub fn randoms(&self) -> &[f32] {
        &self.randoms
    }

    pub fn streaks(&self) -> &[(usize, f32)] {
        &self.streaks
    }
}

// ----------------------------- rasterizer ------------------------------------

#[derive(Clone, Copy, Debug)]
pub struct RenderSettings {
    pub streak_length: f32,
    pub streak_width: f32,
    pub show_streaks: bool,
    pub show_lines: bool,
}

impl From<&Config> for RenderSettings {
    fn from(c: &Config) -> Self {
        Self {
            streak_length: c.streak_length,
            streak_width: c.streak_width,
            show_streaks: c.show_streaks,
            show_lines: c.show_lines,
        }
    }
}

/// What the host hands over each frame. `scene` is `None` until the atlas
/// exists; in that case only the background is drawn.
pub struct Frame<'a> {
    pub scene: Option<(&'a Atlas, &'a MaskAtlas)>,
    pub uniforms: Uniforms,
}

pub struct Renderer {
    camera: Camera,
    canvas: LightCanvas,
    lut: SrgbLut,
    field: ParticleField,
    pub settings: RenderSettings,
}

impl Renderer {
    pub fn new(width: usize, height: usize, field: ParticleField, settings: RenderSettings) -> Self {
        Self {
            camera: Camera::new(width, height),
            canvas: LightCanvas::new(width, height),
            lut: SrgbLut::new(),
            field,
            settings,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Draw one frame into `out` (which must match the renderer's size).
    pub fn render(&mut self, frame: &Frame<'_>, out: &mut FrameBuffer) -> Result<()> {
        let bg = self.lut.unpack(BACKGROUND);
        self.canvas.clear(bg);

        if let Some((atlas, masks)) = frame.scene {
            let u = &frame.uniforms;
            if self.settings.show_lines {
                self.draw_lines(masks, u);
            }
            if self.settings.show_streaks {
                self.draw_streaks(atlas, u);
            }
            self.draw_particles(atlas, u);
        }

        self.canvas.resolve(&self.lut, out)
    }

    fn draw_particles(&mut self, atlas: &Atlas, u: &Uniforms) {
        for (slot, &random) in self.field.randoms.iter().enumerate() {
            let v = particle_vertex(atlas, u, slot, random);
            let Some(p) = self.camera.project(v.position) else { continue };

            // gl_PointSize = size / depth, in pixels
            let radius = (v.size / p.depth * 0.5).max(0.75);
            let r = radius.ceil() as i32;
            let (cx, cy) = (p.x.floor() as i32, p.y.floor() as i32);

            for y in (cy - r)..=(cy + r) {
                for x in (cx - r)..=(cx + r) {
                    let dx = x as f32 + 0.5 - p.x;
                    let dy = y as f32 + 0.5 - p.y;
                    let d = (dx * dx + dy * dy).sqrt() / (2.0 * radius);
                    if let Some(light) = particle_fragment(&v, d) {
                        self.canvas.add(x, y, light);
                    }
                }
            }
        }
    }

    fn draw_streaks(&mut self, atlas: &Atlas, u: &Uniforms) {
        for &(slot, random) in &self.field.streaks {
            let g = streak_geometry(atlas, u, slot, random, self.settings.streak_length, self.settings.streak_width);
            let (Some(a), Some(b)) = (self.camera.project(g.start), self.camera.project(g.end)) else { continue };

            let dx = b.x - a.x;
            let dy = b.y - a.y;
            let len = (dx * dx + dy * dy).sqrt();
            if len < 0.5 {
                continue;
            }
            // perpendicular unit in screen space
            let (nx, ny) = (-dy / len, dx / len);
            let half_px = (g.half_width * self.camera.pixels_per_unit(a.depth)).max(1.0);
            let across = half_px.ceil() as i32;

            // Stamp a cross-section every pixel along the streak
            let steps = len.ceil() as i32;
            for i in 0..=steps {
                let along = i as f32 / steps as f32;
                let px = a.x + dx * along;
                let py = a.y + dy * along;
                for k in -across..=across {
                    let side = k as f32 / half_px;
                    if side.abs() > 1.0 {
                        continue;
                    }
                    let light = streak_fragment(&g, along, side);
                    let x = (px + nx * k as f32).floor() as i32;
                    let y = (py + ny * k as f32).floor() as i32;
                    self.canvas.add(x, y, light);
                }
            }
        }
    }

    fn draw_lines(&mut self, masks: &MaskAtlas, u: &Uniforms) {
        let offset = (u.time * LINE_SPEED) as usize % LINE_SPACING;
        for y in (offset..self.canvas.height).step_by(LINE_SPACING) {
            for x in 0..self.canvas.width {
                let (wx, wy) = self.camera.unproject_ground(x as f32 + 0.5, y as f32 + 0.5);
                let inside_now = masks.coverage_at_world(u.current, wx, wy);
                let inside_next = masks.coverage_at_world(u.next, wx, wy);
                let coverage = inside_now + (inside_next - inside_now) * u.blend;
                if coverage >= 1.0 {
                    continue;
                }
                self.canvas.add(x as i32, y as i32, scale3(LINE_LIGHT, 1.0 - coverage));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::{AtlasBuilder, AtlasEntry};
    use crate::types::ShapeSample;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn constant_sample(x: f32, y: f32) -> ShapeSample {
        ShapeSample::from_texels(vec![[x, y, 0.0, 0.0]; PARTICLE_COUNT])
    }

    fn two_image_scene() -> (Atlas, MaskAtlas) {
        let mut builder = AtlasBuilder::new(4);
        builder.push(AtlasEntry { order: 0, sample: constant_sample(-2.0, 1.0), mask: vec![0; 16], aspect: 1.0 });
        builder.push(AtlasEntry { order: 1, sample: constant_sample(2.0, -1.0), mask: vec![1; 16], aspect: 1.0 });
        builder.build().unwrap().unwrap()
    }

    fn uniforms(blend: f32) -> Uniforms {
        Uniforms { time: 0.0, blend, current: 0, next: 1, total_images: 2, base_size: 25.0 }
    }

    #[test]
    fn palette_runs_cyan_to_magenta() {
        assert_eq!(palette(-6.0), CYAN);
        assert_eq!(palette(6.0), MAGENTA);
        assert_eq!(palette(0.0), [0.5, 0.5, 1.0]);
    }

    #[test]
    fn vertex_interpolates_between_rows() {
        let (atlas, _) = two_image_scene();
        let at = |blend| particle_vertex(&atlas, &uniforms(blend), 10, 0.25).position;

        assert_eq!((at(0.0).x, at(0.0).y), (-2.0, 1.0));
        assert_eq!((at(1.0).x, at(1.0).y), (2.0, -1.0));
        assert_eq!((at(0.5).x, at(0.5).y), (0.0, 0.0));
        assert!(at(0.5).z.abs() <= DRIFT_AMPLITUDE);
    }

    #[test]
    fn pulse_stays_in_range() {
        for i in 0..200 {
            let p = pulse(i as f32 * 0.37, (i % 10) as f32 / 10.0);
            assert!((-0.4..=1.0).contains(&p));
        }
    }

    #[test]
    fn fragment_discards_outside_disc_and_peaks_at_centre() {
        let v = ParticleVertex { position: Vec3::ORIGIN, color: CYAN, alpha: 1.0, pulse: 1.0, size: 25.0 };
        assert!(particle_fragment(&v, 0.51).is_none());
        let centre = particle_fragment(&v, 0.0).unwrap();
        let rim = particle_fragment(&v, 0.45).unwrap();
        assert!(centre[1] > rim[1]);
        assert_eq!(particle_fragment(&v, 0.5).unwrap(), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn camera_centres_origin_and_inverts_on_ground_plane() {
        let cam = Camera::new(800, 600);
        let p = cam.project(Vec3::ORIGIN).unwrap();
        assert_eq!((p.x, p.y, p.depth), (400.0, 300.0, CAMERA_Z));

        let q = cam.project(Vec3::new(1.5, -2.0, 0.0)).unwrap();
        let (x, y) = cam.unproject_ground(q.x, q.y);
        assert!((x - 1.5).abs() < 1e-4 && (y + 2.0).abs() < 1e-4);
        assert!(cam.project(Vec3::new(0.0, 0.0, 20.0)).is_none());
    }

    #[test]
    fn streaks_point_away_from_centre() {
        let (atlas, _) = two_image_scene();
        let g = streak_geometry(&atlas, &uniforms(0.0), 3, 0.1, 2.5, 0.15);
        // anchor (-2, 1): the tip is further out along the same ray
        assert!(g.end.x < g.start.x && g.end.y > g.start.y);
        let cross = g.start.x * g.end.y - g.start.y * g.end.x;
        assert!(cross.abs() < 1e-4);

        // an anchor at the centre falls back to +x
        let g = streak_geometry(&atlas, &uniforms(0.5), 3, 0.1, 2.5, 0.15);
        assert!(g.end.x >= g.start.x && (g.end.y - g.start.y).abs() < 1e-6);
    }

    #[test]
    fn streak_fragment_fades_to_the_edges() {
        let g = StreakGeometry { start: Vec3::ORIGIN, end: Vec3::ORIGIN, color: WHITE, alpha: 1.0, half_width: 0.15 };
        assert_eq!(streak_fragment(&g, 0.0, 1.0), [0.0, 0.0, 0.0]);
        assert!(streak_fragment(&g, 0.0, 0.0)[0] > streak_fragment(&g, 1.0, 0.0)[0]);
    }

    #[test]
    fn no_scene_draws_only_background() {
        let mut rng = StdRng::seed_from_u64(3);
        let field = ParticleField::new(&mut rng, 10);
        let settings = RenderSettings::from(&Config::default());
        let mut renderer = Renderer::new(64, 48, field, settings);
        let mut fb = FrameBuffer::new(64, 48);

        renderer.render(&Frame { scene: None, uniforms: uniforms(0.0) }, &mut fb).unwrap();
        assert!(fb.pixels.iter().all(|&p| p == BACKGROUND));
    }

    #[test]
    fn scene_lights_up_pixels() {
        let (atlas, masks) = two_image_scene();
        let mut rng = StdRng::seed_from_u64(3);
        let field = ParticleField::new(&mut rng, 10);
        let settings = RenderSettings::from(&Config::default());
        let mut renderer = Renderer::new(160, 120, field, settings);
        let mut fb = FrameBuffer::new(160, 120);

        renderer.render(&Frame { scene: Some((&atlas, &masks)), uniforms: uniforms(0.0) }, &mut fb).unwrap();
        assert!(fb.pixels.iter().any(|&p| p != BACKGROUND));
    }

    #[test]
    fn lines_vanish_inside_the_silhouette() {
        let (atlas, masks) = two_image_scene();
        let mut rng = StdRng::seed_from_u64(5);
        let field = ParticleField::new(&mut rng, 0);
        let settings = RenderSettings { show_streaks: false, show_lines: true, ..RenderSettings::from(&Config::default()) };
        let mut renderer = Renderer::new(64, 48, field, settings);
        let mut fb = FrameBuffer::new(64, 48);

        // image 1's mask covers its whole extent; at blend 1 the centre line is hidden
        let u = uniforms(1.0);
        let centre_line = 24 - 24 % LINE_SPACING;
        renderer.render(&Frame { scene: Some((&atlas, &masks)), uniforms: u }, &mut fb).unwrap();
        // particles of image 1 sit at (2, -1); the far left of the centre line is free of them
        assert_eq!(fb.pixels[centre_line * 64 + 30], BACKGROUND);

        let u = uniforms(0.0);
        renderer.render(&Frame { scene: Some((&atlas, &masks)), uniforms: u }, &mut fb).unwrap();
        assert_ne!(fb.pixels[centre_line * 64 + 30], BACKGROUND);
    }
}
