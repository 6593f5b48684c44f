// Hold / morph timing for the outline cycle.
// Visual: one outline stays put for `display` seconds, then flows into the
// next one over `morph` seconds, forever.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Display,
    Morphing,
}

/// Hermite ease on [edge0, edge1], clamped, as GLSL's `smoothstep`.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Per-visual cycle state. Created when the atlas is ready, advanced once per
/// frame, dropped with the scene.
#[derive(Clone, Debug)]
pub struct MorphCycle {
    current: usize,
    next: usize,
    total: usize,
    phase: Phase,
    /// Seconds spent in the current display phase.
    timer: f32,
    /// Raw morph progress in [0, 1).
    progress: f32,
    display_duration: f32,
    morph_duration: f32,
}

impl MorphCycle {
    /// Starts displaying image 0 with image 1 (mod total) queued.
    /// `total_images` must be at least 1; the host only builds a cycle once an
    /// atlas exists.
    pub fn new(total_images: usize, display_duration: f32, morph_duration: f32) -> Self {
        let total = total_images.max(1);
        Self {
            current: 0,
            next: 1 % total,
            total,
            phase: Phase::Display,
            timer: 0.0,
            progress: 0.0,
            display_duration,
            morph_duration,
        }
    }

    /// Advance by `dt` seconds.
    ///
    /// Display accumulates time; once it reaches the display duration the
    /// phase flips to morphing (progress starts counting on the following
    /// tick). Morphing accumulates `dt / morph_duration`; at 1.0 the indices
    /// rotate and the cycle returns to display with both clocks reset.
    pub fn tick(&mut self, dt: f32) {
        match self.phase {
            Phase::Display => {
                self.timer += dt;
                if self.timer >= self.display_duration {
                    self.phase = Phase::Morphing;
                }
            }
            Phase::Morphing => {
                self.progress += dt / self.morph_duration;
                if self.progress >= 1.0 {
                    self.current = self.next;
                    self.next = (self.current + 1) % self.total;
                    self.progress = 0.0;
                    self.timer = 0.0;
                    self.phase = Phase::Display;
                    log::debug!("morph complete: now showing {} (next {})", self.current, self.next);
                }
            }
        }
    }

    /// Jump straight to the morph (host shortcut key).
    pub fn skip_display(&mut self) {
        if self.phase == Phase::Display {
            self.timer = self.display_duration;
            self.phase = Phase::Morphing;
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn next_index(&self) -> usize {
        self.next
    }

    pub fn total_images(&self) -> usize {
        self.total
    }

    /// Raw linear progress of the running morph; 0 while displaying.
    pub fn progress(&self) -> f32 {
        self.progress
    }

    /// Eased blend factor the render stage uses.
    pub fn blend(&self) -> f32 {
        smoothstep(0.0, 1.0, self.progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DISPLAY: f32 = 10.0;
    const MORPH: f32 = 1.5;

    #[test]
    fn starts_displaying_first_image() {
        let cycle = MorphCycle::new(3, DISPLAY, MORPH);
        assert_eq!(cycle.phase(), Phase::Display);
        assert_eq!((cycle.current_index(), cycle.next_index()), (0, 1));
        assert_eq!(MorphCycle::new(1, DISPLAY, MORPH).next_index(), 0);
    }

    #[test]
    fn enters_morph_after_display_duration() {
        let mut cycle = MorphCycle::new(3, DISPLAY, MORPH);
        cycle.tick(DISPLAY - 0.5);
        assert_eq!(cycle.phase(), Phase::Display);
        cycle.tick(0.5);
        assert_eq!(cycle.phase(), Phase::Morphing);
        assert_eq!(cycle.progress(), 0.0);
    }

    #[test]
    fn rotates_indices_after_morph_duration() {
        let mut cycle = MorphCycle::new(3, DISPLAY, MORPH);
        cycle.tick(DISPLAY);
        cycle.tick(MORPH * 0.5);
        assert_eq!(cycle.phase(), Phase::Morphing);
        assert!((cycle.progress() - 0.5).abs() < 1e-6);
        assert!((cycle.blend() - 0.5).abs() < 1e-6);

        cycle.tick(MORPH * 0.5);
        assert_eq!(cycle.phase(), Phase::Display);
        assert_eq!((cycle.current_index(), cycle.next_index()), (1, 2));
        assert_eq!(cycle.progress(), 0.0);
    }

    #[test]
    fn wraps_around_the_last_image() {
        let mut cycle = MorphCycle::new(2, DISPLAY, MORPH);
        for _ in 0..2 {
            cycle.tick(DISPLAY);
            cycle.tick(MORPH);
        }
        assert_eq!((cycle.current_index(), cycle.next_index()), (0, 1));
    }

    #[test]
    fn frame_sized_steps_reach_the_same_state() {
        let mut cycle = MorphCycle::new(4, 1.0, 0.5);
        let dt = 1.0 / 64.0; // exact in binary
        for _ in 0..64 {
            cycle.tick(dt);
        }
        assert_eq!(cycle.phase(), Phase::Morphing);
        for _ in 0..32 {
            cycle.tick(dt);
        }
        assert_eq!(cycle.phase(), Phase::Display);
        assert_eq!(cycle.current_index(), 1);
    }

    #[test]
    fn skip_display_starts_morph_now() {
        let mut cycle = MorphCycle::new(3, DISPLAY, MORPH);
        cycle.skip_display();
        assert_eq!(cycle.phase(), Phase::Morphing);
    }

    #[test]
    fn smoothstep_matches_glsl() {
        assert_eq!(smoothstep(0.0, 1.0, -1.0), 0.0);
        assert_eq!(smoothstep(0.0, 1.0, 2.0), 1.0);
        assert_eq!(smoothstep(-5.0, 5.0, 0.0), 0.5);
    }
}
