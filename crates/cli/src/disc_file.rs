//! Disc description files.
//!
//! A disc file is TOML: the disc fields, its `[[tracks]]`, an optional
//! `select` list of track numbers to convert and an optional `[profile]`
//! replacing the configured one. Relative paths are resolved against the
//! file's directory.
//!
//! ```toml
//! audio_file = "image.flac"
//! title = "Album"
//! performer = "Artist"
//! select = [1, 3]
//!
//! [[tracks]]
//! index = 0
//! number = 1
//! index01 = "00:00:00"
//! result_path = "out/01 - Intro.flac"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use discoder_core::{Disc, Profile, Track};

#[derive(Debug, Deserialize)]
struct DiscFile {
    #[serde(flatten)]
    disc: Disc,
    #[serde(default)]
    select: Option<Vec<u32>>,
    #[serde(default)]
    profile: Option<Profile>,
}

/// A disc ready to hand to the runner.
#[derive(Debug)]
pub struct LoadedDisc {
    pub disc: Disc,
    /// The tracks to convert, in disc order.
    pub tracks: Vec<Track>,
    pub profile: Option<Profile>,
}

/// Reads the disc description at `path`.
pub fn load_disc(path: &Path) -> Result<LoadedDisc> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read disc file {:?}", path))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    parse_disc(&text, base).with_context(|| format!("Invalid disc file {:?}", path))
}

fn parse_disc(text: &str, base: &Path) -> Result<LoadedDisc> {
    let file: DiscFile = toml::from_str(text)?;
    let mut disc = file.disc.link_tracks();
    if disc.tracks.is_empty() {
        bail!("disc has no tracks");
    }

    disc.audio_file = resolve(base, &disc.audio_file);
    disc.cover_image = disc.cover_image.as_deref().map(|p| resolve(base, p));
    for track in &mut disc.tracks {
        track.result_path = resolve(base, &track.result_path);
    }

    let tracks: Vec<Track> = match &file.select {
        None => disc.tracks.clone(),
        Some(numbers) => {
            if let Some(missing) = numbers
                .iter()
                .find(|n| !disc.tracks.iter().any(|t| t.number == **n))
            {
                bail!("selected track {} is not on the disc", missing);
            }
            disc.tracks
                .iter()
                .filter(|t| numbers.contains(&t.number))
                .cloned()
                .collect()
        }
    };

    Ok(LoadedDisc {
        disc,
        tracks,
        profile: file.profile,
    })
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
