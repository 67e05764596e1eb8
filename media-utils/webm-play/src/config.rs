use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The default value for [PlayConfig::frame_limit].
pub const DEFAULT_FRAME_LIMIT: u64 = i32::MAX as u64;

fn default_frame_limit() -> u64 {
    DEFAULT_FRAME_LIMIT
}

/// The default value for [PlayConfig::channel_capacity].
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1;

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

/// Configuration of a playback run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlayConfig {
    /// The WebM file to play.
    pub input: PathBuf,
    /// Stop after rendering this many frames.
    #[serde(default = "default_frame_limit")]
    pub frame_limit: u64,
    /// Track number to play. If not given, the first video track is played.
    #[serde(default)]
    pub track: Option<u64>,
    /// Capacity of the packet and frame queues.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Also write log messages to this file.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default)]
    pub disable_console: bool,
}

impl PlayConfig {
    pub fn new<P: Into<PathBuf>>(input: P) -> Self {
        Self {
            input: input.into(),
            frame_limit: DEFAULT_FRAME_LIMIT,
            track: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            logging: LoggingConfig::default(),
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Parse a `.toml` file.
    ///
    /// Relative paths in the file are relative to the directory containing it.
    pub fn from_toml_path<P: AsRef<Path>>(fname: P) -> Result<Self> {
        let fname = fname.as_ref();
        let open_error = |source| Error::Open {
            path: fname.to_path_buf(),
            source,
        };
        let contents = std::fs::read_to_string(fname).map_err(open_error)?;
        let mut cfg = Self::from_toml_str(&contents)?;
        if let Some(dirname) = fname.parent() {
            fixup_relative_path(&mut cfg.input, dirname);
            if let Some(log_file) = &mut cfg.logging.log_file {
                fixup_relative_path(log_file, dirname);
            }
        }
        Ok(cfg)
    }
}

/// If `path` is relative, make it relative to `dirname`.
fn fixup_relative_path(path: &mut PathBuf, dirname: &Path) {
    if path.is_relative() {
        *path = dirname.join(&path);
    }
}
