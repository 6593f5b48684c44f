// What you SEE:
// • A dark navy window opens straight away.
// • Once the images listed in `<asset_base>/images.txt` are processed, ~3000
//   glowing particles trace the outline of the first one.
// • Every few seconds the particles flow into the next outline.
// • S toggles the streaks, L the scan lines, N starts the next morph now. ESC quits.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{error, info};
use rand::SeedableRng;
use rand::rngs::StdRng;

use outline_morph::atlas::{Atlas, MaskAtlas};
use outline_morph::config::Config;
use outline_morph::draw::{Drawer, draw_progress_bar, draw_text_5x7};
use outline_morph::error::Error;
use outline_morph::feed::{ImageFeed, LoadEvent, LoadOptions, Loader};
use outline_morph::morph::{MorphCycle, Phase};
use outline_morph::render::{Frame, ParticleField, RenderSettings, Renderer, Uniforms};
use outline_morph::transport::StaticDir;
use outline_morph::types::FrameBuffer;

/// Everything that exists only while the visual is on screen.
struct Scene {
    loader: Option<Loader>,
    atlas: Option<(Atlas, MaskAtlas)>,
    cycle: Option<MorphCycle>,
    failed: bool,
}

impl Scene {
    fn start(config: &Config) -> Self {
        let feed = ImageFeed::new(Arc::new(StaticDir::new(&config.asset_base)), "");
        let opts = LoadOptions { mask_resolution: config.mask_resolution, seed: config.seed };
        Self { loader: Some(Loader::spawn(feed, opts)), atlas: None, cycle: None, failed: false }
    }

    /// Pick up the loader's result once it lands.
    fn poll(&mut self, config: &Config) {
        let Some(event) = self.loader.as_mut().and_then(Loader::poll) else { return };
        self.loader = None;
        match event {
            LoadEvent::Ready(Some((atlas, masks))) => {
                self.cycle = Some(MorphCycle::new(atlas.total_images(), config.display_duration, config.morph_duration));
                self.atlas = Some((atlas, masks));
            }
            LoadEvent::Ready(None) => self.failed = true,
            LoadEvent::Failed(e) => {
                error!("image feed failed: {e}");
                self.failed = true;
            }
        }
    }

    fn status(&self) -> String {
        match &self.cycle {
            Some(c) => match c.phase() {
                Phase::Display => format!("IMG {}/{}", c.current_index() + 1, c.total_images()),
                Phase::Morphing => format!(
                    "MORPH {}/{} {:.0}%",
                    c.next_index() + 1,
                    c.total_images(),
                    c.progress() * 100.0
                ),
            },
            None if self.failed => "NO IMAGES".to_string(),
            None => "LOADING".to_string(),
        }
    }

    fn dispose(&mut self) {
        if let Some(mut loader) = self.loader.take() {
            loader.dispose();
        }
        self.cycle = None;
        self.atlas = None;
    }
}

fn main() -> Result<(), Error> {
    env_logger::init();

    let config = Config::from_args(std::env::args().skip(1))?;
    info!("loading images from {}", config.asset_base.display());

    /* --- Window + buffers ---
       Visual: empty navy window at the configured size. */
    let (w, h) = (config.window_width, config.window_height);
    let mut drawer = Drawer::new("Outline Morph", w, h)?;
    let mut screen = FrameBuffer::new(w, h);

    /* --- Fixed per-particle randomness ---
       Visual: each particle keeps its own pulse phase for the whole run. */
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let field = ParticleField::new(&mut rng, config.streak_count);
    let mut renderer = Renderer::new(w, h, field, RenderSettings::from(&config));

    let mut scene = Scene::start(&config);

    /* --- HUD / FPS --- */
    let started = Instant::now();
    let mut last_fps_time = Instant::now();
    let mut frames_this_second: u32 = 0;
    let mut hud_fps_text = String::from("FPS: 0.0");
    let mut last_frame_time = Instant::now();

    /* ------------------------------ Main loop ------------------------------ */
    while drawer.is_open() && !drawer.esc_pressed() {
        let now = Instant::now();
        let dt = (now - last_frame_time).as_secs_f32();
        last_frame_time = now;
        let elapsed = (now - started).as_secs_f32();

        scene.poll(&config);

        /* 1) Inputs */
        if drawer.s_pressed_once() {
            renderer.settings.show_streaks = !renderer.settings.show_streaks;
        }
        if drawer.l_pressed_once() {
            renderer.settings.show_lines = !renderer.settings.show_lines;
        }
        if drawer.n_pressed_once() {
            if let Some(cycle) = scene.cycle.as_mut() {
                cycle.skip_display();
            }
        }

        /* 2) Advance the morph clock and build this frame's uniforms. */
        let uniforms = match scene.cycle.as_mut() {
            Some(cycle) => {
                cycle.tick(dt);
                Uniforms::from_cycle(cycle, elapsed, config.base_particle_size)
            }
            None => Uniforms {
                time: elapsed,
                blend: 0.0,
                current: 0,
                next: 0,
                total_images: 0,
                base_size: config.base_particle_size,
            },
        };

        /* 3) Render particles, streaks and lines (or just the background). */
        let frame = Frame { scene: scene.atlas.as_ref().map(|(a, m)| (a, m)), uniforms };
        renderer.render(&frame, &mut screen)?;

        /* 4) HUD on top */
        if let Some(cycle) = &scene.cycle {
            if cycle.phase() == Phase::Morphing {
                draw_progress_bar(&mut screen, 0, h as i32 - 3, w as i32, 3, cycle.progress(), 0x00_22_D3_EE);
            }
        }
        let hud = format!("{} | {} | S streaks  L lines  N next", scene.status(), hud_fps_text);
        draw_text_5x7(&mut screen, 8, 8, &hud, 0x00_FF_FF_FF);

        /* 5) Present */
        drawer.present(&screen)?;

        frames_this_second += 1;
        if now.duration_since(last_fps_time) >= Duration::from_secs(1) {
            let secs = now.duration_since(last_fps_time).as_secs_f32();
            hud_fps_text = format!("FPS: {:.1}", frames_this_second as f32 / secs);
            frames_this_second = 0;
            last_fps_time = now;
        }
    }

    scene.dispose();
    info!("bye");
    Ok(())
}
