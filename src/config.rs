// Tunables for the outline morph. Everything has a default; a JSON file may
// override any subset of fields.
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Particles per image. Fixed at compile time: the atlas row width.
pub const PARTICLE_COUNT: usize = 3000;

/// World span of an image's height (width is this × aspect).
pub const WORLD_SPAN: f32 = 10.0;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding `images.txt` and `images/`.
    pub asset_base: PathBuf,
    pub window_width: usize,
    pub window_height: usize,
    /// Seconds a shape is held before morphing.
    pub display_duration: f32,
    /// Seconds a morph takes.
    pub morph_duration: f32,
    pub base_particle_size: f32,
    pub streak_count: usize,
    pub streak_length: f32,
    pub streak_width: f32,
    /// Side length of each downsampled silhouette mask.
    pub mask_resolution: usize,
    pub show_streaks: bool,
    pub show_lines: bool,
    /// Fixes slot sampling and particle phases; random when absent.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            asset_base: PathBuf::from("a14u"),
            window_width: 960,
            window_height: 540,
            display_duration: 10.0,
            morph_duration: 1.5,
            base_particle_size: 25.0,
            streak_count: 300,
            streak_length: 2.5,
            streak_width: 0.15,
            mask_resolution: 128,
            show_streaks: true,
            show_lines: true,
            seed: None,
        }
    }
}

impl Config {
    /// Read a JSON config file; missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
        let config: Config = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Build from command-line arguments: `[asset_base] [--config <file>]`.
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        let mut file: Option<PathBuf> = None;
        let mut base: Option<PathBuf> = None;

        let mut it = args.into_iter();
        while let Some(arg) = it.next() {
            if arg == "--config" {
                let value = it
                    .next()
                    .ok_or_else(|| Error::Config("--config needs a file path".into()))?;
                file = Some(PathBuf::from(value));
            } else if arg.starts_with("--") {
                return Err(Error::Config(format!("unknown flag {arg}")));
            } else {
                base = Some(PathBuf::from(arg));
            }
        }

        let mut config = match file {
            Some(path) => Config::from_file(&path)?,
            None => Config::default(),
        };
        if let Some(base) = base {
            config.asset_base = base;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.display_duration > 0.0) || !(self.morph_duration > 0.0) {
            return Err(Error::Config("durations must be positive".into()));
        }
        if self.window_width == 0 || self.window_height == 0 {
            return Err(Error::Config("window size must be non-zero".into()));
        }
        if self.mask_resolution == 0 {
            return Err(Error::Config("mask_resolution must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: Config = serde_json::from_str(r#"{"morph_duration": 3.0, "seed": 7}"#).unwrap();
        assert_eq!(config.morph_duration, 3.0);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.display_duration, 10.0);
        assert_eq!(config.mask_resolution, 128);
    }

    #[test]
    fn positional_arg_overrides_asset_base() {
        let config = Config::from_args(vec!["/srv/media/a14u".to_string()]).unwrap();
        assert_eq!(config.asset_base, PathBuf::from("/srv/media/a14u"));
    }

    #[test]
    fn rejects_unknown_flags_and_bad_durations() {
        assert!(matches!(Config::from_args(vec!["--fast".to_string()]), Err(Error::Config(_))));

        let config = Config { morph_duration: 0.0, ..Config::default() };
        assert!(config.validate().is_err());
    }
}
