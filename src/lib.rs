//! Particle outlines of a set of images, morphing from one to the next.
//!
//! Pipeline: `feed` loads the images listed in a manifest, `vision` extracts
//! each one's contour, `sampler` draws a fixed number of particle positions
//! from it, `atlas` packs those into rows, `morph` decides which two rows to
//! blend and how far, and `render` draws the blend into a framebuffer.
//! `content` and `gallery` are the site's JSON clients that sit beside it.

pub mod atlas;
pub mod config;
pub mod content;
pub mod draw;
pub mod error;
pub mod feed;
pub mod fixtures;
pub mod gallery;
pub mod gamma;
pub mod morph;
pub mod render;
pub mod sampler;
pub mod transport;
pub mod types;
pub mod vision;
