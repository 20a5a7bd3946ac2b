//! Track catalog: the fixed, ordered playlist the trainer offers.
//!
//! A catalog is either the built-in trainer set or a TOML file with one
//! `[[tracks]]` table per clip. Relative sources resolve against the catalog
//! file's directory and `~` is expanded, so a catalog can travel with its
//! audio folder.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::constants::AUDIO_EXTENSIONS;

pub type TrackId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub label: String,
    pub source: String,
}

impl Track {
    pub fn new(id: TrackId, label: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            source: source.into(),
        }
    }

    /// Whether the source extension is one the rodio decoder is built for.
    pub fn has_supported_extension(&self) -> bool {
        Path::new(&self.source)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| AUDIO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false)
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("catalog contains no tracks")]
    Empty,
    #[error("duplicate track id {0}")]
    DuplicateId(TrackId),
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    tracks: Vec<Track>,
}

/// Immutable, ordered track list. Identity is `Track::id`.
#[derive(Debug, Clone)]
pub struct Catalog {
    tracks: Vec<Track>,
}

impl Catalog {
    pub fn new(tracks: Vec<Track>) -> Result<Self, CatalogError> {
        if tracks.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::with_capacity(tracks.len());
        for track in &tracks {
            if !seen.insert(track.id) {
                return Err(CatalogError::DuplicateId(track.id));
            }
        }

        Ok(Self { tracks })
    }

    /// The fifteen-clip set the trainer ships with, read from `Audio/`.
    pub fn builtin() -> Self {
        const CLIPS: &[&str] = &[
            "1_Asereje",
            "2_Rebelde",
            "3_Despacito",
            "4_Torero",
            "5_La_Bikina",
            "6_Adios_Amor",
            "7_SiNoMeVes",
            "8_Shabadaba",
            "9_Mienteme",
            "10_Yo_Quiero_Chupar",
            "11_Shrakira",
            "12_Angel",
            "13_Boda",
            "14_Muriendo_Lento",
            "15_Halloween",
        ];

        let tracks = CLIPS
            .iter()
            .zip(1..)
            .map(|(clip, id)| Track::new(id, id.to_string(), format!("Audio/{clip}.m4a")))
            .collect();

        Self { tracks }
    }

    pub fn from_toml_str(contents: &str, base_dir: Option<&Path>) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(contents)?;
        let tracks = file
            .tracks
            .into_iter()
            .map(|mut track| {
                track.source = resolve_source(&track.source, base_dir);
                track
            })
            .collect();
        Self::new(tracks)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let contents = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_toml_str(&contents, path.parent())?;
        log::info!(
            "Loaded catalog {} with {} tracks",
            path.display(),
            catalog.len()
        );
        Ok(catalog)
    }

    /// Load `path` if given, otherwise fall back to the built-in set.
    pub fn load_or_builtin(path: Option<&str>) -> Result<Self, CatalogError> {
        match path {
            Some(path) => {
                let expanded = shellexpand::tilde(path);
                Self::load(Path::new(expanded.as_ref()))
            }
            None => Ok(Self::builtin()),
        }
    }

    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

fn resolve_source(source: &str, base_dir: Option<&Path>) -> String {
    let expanded = shellexpand::tilde(source).into_owned();
    let path = Path::new(&expanded);
    match base_dir {
        Some(base) if path.is_relative() && !base.as_os_str().is_empty() => {
            base.join(path).to_string_lossy().to_string()
        }
        _ => expanded,
    }
}
