//! Clip references and clip loaders
//!
//! The core never decodes audio. A [`Clip`] is an opaque, cheaply cloned
//! reference; a [`ClipLoader`] turns a file reference from an override
//! definition into one, or reports why it cannot.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SoundError;

/// Supported audio formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioFormat {
    /// WAV uncompressed
    Wav,
    /// OGG Vorbis compressed
    Ogg,
    /// MP3 compressed
    Mp3,
    /// FLAC lossless
    Flac,
    /// Unknown format
    Unknown,
}

impl AudioFormat {
    /// Detect audio format from magic bytes
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.len() < 4 {
            return Self::Unknown;
        }

        match &bytes[0..4] {
            b"RIFF" => Self::Wav,
            b"OggS" => Self::Ogg,
            b"fLaC" => Self::Flac,
            // MP3 can start with ID3 tag or frame sync
            [0xFF, 0xFB, _, _] | [0xFF, 0xFA, _, _] | [b'I', b'D', b'3', _] => Self::Mp3,
            _ => Self::Unknown,
        }
    }

    /// Guess the format from a file extension
    pub fn from_extension(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("wav") => Self::Wav,
            Some("ogg") => Self::Ogg,
            Some("mp3") => Self::Mp3,
            Some("flac") => Self::Flac,
            _ => Self::Unknown,
        }
    }

    /// Whether files with this extension are picked up by the sound catalog
    pub fn is_supported_extension(path: &Path) -> bool {
        Self::from_extension(path) != Self::Unknown
    }
}

/// Opaque reference to a playable asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    name: String,
    source: Option<PathBuf>,
    format: AudioFormat,
    length_secs: f32,
}

impl Clip {
    /// Clip known only by name, as found on a vehicle prefab
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
            format: AudioFormat::Unknown,
            length_secs: 0.0,
        }
    }

    /// Clip backed by a file on disk
    pub fn from_file(path: impl Into<PathBuf>, format: AudioFormat) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        Self {
            name,
            source: Some(path),
            format,
            length_secs: 0.0,
        }
    }

    /// Set the playback length in seconds
    pub fn with_length(mut self, seconds: f32) -> Self {
        self.length_secs = seconds.max(0.0);
        self
    }

    /// Clip name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File the clip was loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Encoded format
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Length in seconds (0 when unknown)
    pub fn length_secs(&self) -> f32 {
        self.length_secs
    }
}

/// Resolves file references from override definitions into clips
pub trait ClipLoader {
    /// Load (or fetch from cache) the clip behind `path`
    fn load_clip(&mut self, path: &Path) -> Result<Clip, SoundError>;
}

/// Loader that validates files on disk by sniffing their header
///
/// Clips are memoised by resolved path; a file is only opened once.
#[derive(Debug, Default)]
pub struct FsClipLoader {
    base_dir: Option<PathBuf>,
    cache: HashMap<PathBuf, Clip>,
}

impl FsClipLoader {
    /// Create a loader resolving paths as given
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `dir`
    pub fn with_base_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(dir.into()),
            cache: HashMap::new(),
        }
    }

    /// Number of memoised clips
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Forget every memoised clip (e.g. after the catalog was reloaded)
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl ClipLoader for FsClipLoader {
    fn load_clip(&mut self, path: &Path) -> Result<Clip, SoundError> {
        let full_path = self.resolve(path);
        if let Some(clip) = self.cache.get(&full_path) {
            return Ok(clip.clone());
        }

        let display = full_path.display().to_string();
        let mut file = File::open(&full_path)
            .map_err(|e| SoundError::configuration(&display, format!("cannot open audio file: {e}")))?;
        let mut header = [0u8; 12];
        let read = file
            .read(&mut header)
            .map_err(|e| SoundError::configuration(&display, format!("cannot read audio file: {e}")))?;
        if read == 0 {
            return Err(SoundError::configuration(&display, "empty audio file"));
        }

        let format = AudioFormat::detect(&header[..read]);
        if format == AudioFormat::Unknown {
            return Err(SoundError::configuration(&display, "unknown audio format"));
        }

        log::debug!("Loaded {:?} clip from {}", format, display);
        let clip = Clip::from_file(full_path.clone(), format);
        self.cache.insert(full_path, clip.clone());
        Ok(clip)
    }
}

/// Loader that trusts every reference and never touches disk
///
/// For hosts that decode audio themselves and only need the reference.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpaqueClipLoader;

impl ClipLoader for OpaqueClipLoader {
    fn load_clip(&mut self, path: &Path) -> Result<Clip, SoundError> {
        if path.file_stem().is_none() {
            return Err(SoundError::configuration(
                path.display().to_string(),
                "clip reference has no file name",
            ));
        }
        Ok(Clip::from_file(path, AudioFormat::from_extension(path)))
    }
}
