// Loads the configured source images and turns them into an atlas, off the
// render thread.
// Visual expectation: the window opens immediately on an empty background;
// the outline fades in as soon as every image has been processed. Images
// that fail to load are skipped, and if all fail the background stays empty.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::JoinHandle;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::atlas::{Atlas, AtlasBuilder, AtlasEntry, MaskAtlas};
use crate::error::{Error, Result};
use crate::sampler::generate_shape_data;
use crate::transport::{Request, Transport};
use crate::vision::{downsample_mask, extract_edges};

/// Shared "stop now" flag. Cloning shares the flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once cancelled, for use with `?`.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() { Err(Error::Cancelled) } else { Ok(()) }
    }
}

/// Split `images.txt`: one filename per line, blank lines ignored.
pub fn parse_manifest(text: &str) -> Vec<String> {
    text.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_owned).collect()
}

/// The static image feed under `base` (`{base}/images.txt`, `{base}/images/*`).
#[derive(Clone)]
pub struct ImageFeed {
    transport: Arc<dyn Transport>,
    base: String,
}

impl ImageFeed {
    pub fn new(transport: Arc<dyn Transport>, base: impl Into<String>) -> Self {
        Self { transport, base: base.into().trim_end_matches('/').to_string() }
    }

    /// Fetch the manifest, cache-busted with the current time.
    pub fn manifest(&self) -> Result<Vec<String>> {
        let stamp = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis()).unwrap_or(0);
        let path = format!("{}/images.txt?t={stamp}", self.base);
        let body = self
            .transport
            .get(&Request::bytes(path.as_str()))
            .and_then(|res| res.into_body(&path))
            .map_err(|e| Error::Manifest(e.to_string()))?;
        Ok(parse_manifest(&String::from_utf8_lossy(&body)))
    }

    pub fn fetch_image(&self, filename: &str) -> Result<Vec<u8>> {
        let path = format!("{}/images/{filename}", self.base);
        self.transport.get(&Request::bytes(path.as_str()))?.into_body(&path)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct LoadOptions {
    pub mask_resolution: usize,
    /// Per-image RNGs are seeded from `seed + manifest index`.
    pub seed: Option<u64>,
}

/// Decode, extract and sample one image.
pub fn process_image(feed: &ImageFeed, order: usize, filename: &str, opts: &LoadOptions) -> Result<AtlasEntry> {
    let bytes = feed.fetch_image(filename)?;
    let img = image::load_from_memory(&bytes)
        .map_err(|source| Error::ImageDecode { name: filename.to_string(), source })?
        .to_rgba8();

    let edges = extract_edges(&img);
    let mut rng = match opts.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(order as u64)),
        None => StdRng::from_entropy(),
    };
    let sample = generate_shape_data(&edges.points, &mut rng);
    let mask = downsample_mask(&edges.mask, opts.mask_resolution)?;

    Ok(AtlasEntry { order, sample, mask, aspect: edges.width as f32 / edges.height as f32 })
}

/// Run the whole feed: manifest → parallel per-image processing → atlas.
/// `Ok(None)` when the manifest is empty or every image failed.
pub fn load_atlas(feed: &ImageFeed, opts: &LoadOptions, cancel: &CancelToken) -> Result<Option<(Atlas, MaskAtlas)>> {
    let manifest = feed.manifest()?;
    info!("manifest lists {} image(s)", manifest.len());
    if manifest.is_empty() {
        return Ok(None);
    }

    let entries: Vec<AtlasEntry> = manifest
        .par_iter()
        .enumerate()
        .filter_map(|(order, name)| {
            if cancel.is_cancelled() {
                return None;
            }
            match process_image(feed, order, name, opts) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("skipping {name}: {e}");
                    None
                }
            }
        })
        .collect();
    cancel.check()?;

    let mut builder = AtlasBuilder::new(opts.mask_resolution);
    for entry in entries {
        builder.push(entry);
    }
    let loaded = builder.len();
    let built = builder.build()?;
    match &built {
        Some((atlas, _)) => info!("atlas ready: {loaded}/{} image(s), {} particles each", manifest.len(), atlas.width()),
        None => warn!("no image could be loaded; nothing will be drawn"),
    }
    Ok(built)
}

/// Outcome delivered to the render loop.
pub enum LoadEvent {
    Ready(Option<(Atlas, MaskAtlas)>),
    Failed(Error),
}

/// Background loader owned by the visual. Dropping it cancels and joins.
pub struct Loader {
    cancel: CancelToken,
    rx: Receiver<LoadEvent>,
    worker: Option<JoinHandle<()>>,
    finished: bool,
}

impl Loader {
    pub fn spawn(feed: ImageFeed, opts: LoadOptions) -> Self {
        let cancel = CancelToken::new();
        let (tx, rx) = mpsc::channel();
        let token = cancel.clone();

        let worker = std::thread::spawn(move || {
            let event = match load_atlas(&feed, &opts, &token) {
                Ok(built) => LoadEvent::Ready(built),
                Err(Error::Cancelled) => return,
                Err(e) => LoadEvent::Failed(e),
            };
            if !token.is_cancelled() {
                // The receiver may already be gone; nothing to do then.
                let _ = tx.send(event);
            }
        });

        Self { cancel, rx, worker: Some(worker), finished: false }
    }

    /// Non-blocking; `Some` exactly once when loading finishes. A worker
    /// that dies without reporting shows up as `Failed(LoaderStopped)`.
    pub fn poll(&mut self) -> Option<LoadEvent> {
        if self.finished {
            return None;
        }
        let event = match self.rx.try_recv() {
            Ok(event) => event,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => {
                self.join_worker();
                LoadEvent::Failed(Error::LoaderStopped)
            }
        };
        self.finished = true;
        Some(event)
    }

    /// Block until loading finishes (tests, headless use).
    pub fn wait(mut self) -> Option<LoadEvent> {
        if self.finished {
            return None;
        }
        let event = self.rx.recv().unwrap_or(LoadEvent::Failed(Error::LoaderStopped));
        self.finished = true;
        self.join_worker();
        Some(event)
    }

    /// Stop the worker and wait for it. Filesystem reads already running
    /// complete, but their results are dropped, including one that was
    /// already queued.
    pub fn dispose(&mut self) {
        self.cancel.cancel();
        self.join_worker();
        while self.rx.try_recv().is_ok() {}
        self.finished = true;
    }

    fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("loader thread panicked");
            }
        }
    }
}

impl Drop for Loader {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Response;
    use std::collections::HashMap;
    use std::io::Cursor;

    struct MemoryFeed {
        files: HashMap<String, Vec<u8>>,
    }

    impl Transport for MemoryFeed {
        fn get(&self, request: &Request) -> Result<Response> {
            let path = request.path.split('?').next().unwrap_or_default();
            Ok(match self.files.get(path) {
                Some(body) => Response { status: 200, body: body.clone() },
                None => Response { status: 404, body: Vec::new() },
            })
        }
    }

    fn png_square(size: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_fn(size, size, |x, y| {
            let inside = (size / 4..3 * size / 4).contains(&x) && (size / 4..3 * size / 4).contains(&y);
            if inside { image::Rgba([255, 255, 255, 255]) } else { image::Rgba([0, 0, 0, 255]) }
        });
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn feed(files: Vec<(&str, Vec<u8>)>) -> ImageFeed {
        let files = files.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        ImageFeed::new(Arc::new(MemoryFeed { files }), "/a14u/")
    }

    const OPTS: LoadOptions = LoadOptions { mask_resolution: 8, seed: Some(11) };

    #[test]
    fn manifest_lines_are_trimmed_and_blank_lines_dropped() {
        assert_eq!(parse_manifest(" a.png \n\n b.jpg\r\n  \n"), vec!["a.png", "b.jpg"]);
    }

    #[test]
    fn failed_images_are_skipped_and_order_is_kept() {
        let feed = feed(vec![
            ("/a14u/images.txt", b"one.png\nbroken.png\nmissing.png\ntwo.png\n".to_vec()),
            ("/a14u/images/one.png", png_square(32)),
            ("/a14u/images/broken.png", b"not a png".to_vec()),
            ("/a14u/images/two.png", png_square(48)),
        ]);

        let (atlas, masks) = load_atlas(&feed, &OPTS, &CancelToken::new()).unwrap().unwrap();
        assert_eq!(atlas.total_images(), 2);
        assert_eq!(masks.total_images(), 2);
    }

    #[test]
    fn all_failures_yield_no_atlas() {
        let feed = feed(vec![("/a14u/images.txt", b"gone.png\n".to_vec())]);
        assert!(load_atlas(&feed, &OPTS, &CancelToken::new()).unwrap().is_none());
    }

    #[test]
    fn missing_manifest_is_a_manifest_error() {
        let feed = feed(vec![]);
        assert!(matches!(load_atlas(&feed, &OPTS, &CancelToken::new()), Err(Error::Manifest(_))));
    }

    #[test]
    fn cancelled_load_reports_cancellation() {
        let feed = feed(vec![
            ("/a14u/images.txt", b"one.png\n".to_vec()),
            ("/a14u/images/one.png", png_square(16)),
        ]);
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(load_atlas(&feed, &OPTS, &cancel), Err(Error::Cancelled)));
    }

    #[test]
    fn seeded_loads_are_reproducible() {
        let files = vec![
            ("/a14u/images.txt", b"one.png\n".to_vec()),
            ("/a14u/images/one.png", png_square(40)),
        ];
        let a = load_atlas(&feed(files.clone()), &OPTS, &CancelToken::new()).unwrap().unwrap().0;
        let b = load_atlas(&feed(files), &OPTS, &CancelToken::new()).unwrap().unwrap().0;
        assert_eq!(a.data(), b.data());
    }

    #[test]
    fn background_loader_delivers_once() {
        let feed = feed(vec![
            ("/a14u/images.txt", b"one.png\n".to_vec()),
            ("/a14u/images/one.png", png_square(24)),
        ]);
        let loader = Loader::spawn(feed, OPTS);
        match loader.wait() {
            Some(LoadEvent::Ready(Some((atlas, _)))) => assert_eq!(atlas.total_images(), 1),
            _ => panic!("expected a ready atlas"),
        }
    }

    #[test]
    fn disposed_loader_never_delivers() {
        let feed = feed(vec![("/a14u/images.txt", b"\n".to_vec())]);
        let mut loader = Loader::spawn(feed, OPTS);
        // let the worker finish and queue its result first
        std::thread::sleep(std::time::Duration::from_millis(200));
        loader.dispose();
        assert!(loader.poll().is_none());
    }

    struct Exploding;

    impl Transport for Exploding {
        fn get(&self, _: &Request) -> Result<Response> {
            panic!("transport blew up");
        }
    }

    #[test]
    fn panicked_worker_is_reported_once() {
        let feed = ImageFeed::new(Arc::new(Exploding), "/a14u");
        let mut loader = Loader::spawn(feed, OPTS);
        let event = loop {
            if let Some(event) = loader.poll() {
                break event;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        };
        assert!(matches!(event, LoadEvent::Failed(Error::LoaderStopped)));
        assert!(loader.poll().is_none());

        let waited = Loader::spawn(ImageFeed::new(Arc::new(Exploding), "/a14u"), OPTS).wait();
        assert!(matches!(waited, Some(LoadEvent::Failed(Error::LoaderStopped))));
    }
}
