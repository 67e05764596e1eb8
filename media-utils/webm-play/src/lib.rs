//! Play a WebM video track through a decoder and a frame sink.
//!
//! Demuxing, decoding and rendering run concurrently, connected by bounded
//! queues. See [play].

use std::path::PathBuf;

pub use config::{LoggingConfig, PlayConfig, DEFAULT_CHANNEL_CAPACITY, DEFAULT_FRAME_LIMIT};
pub use logging::init_logging;
pub use pipeline::{play, play_reader, FrameSink, PacketDecoder, PlaybackSummary};

mod config;
mod logging;
mod pipeline;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("demux error: {source}")]
    Demux {
        #[from]
        source: webm_demux::Error,
    },
    #[error("could not open \"{}\": {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("TOML deserialization error: {source}")]
    Toml {
        #[from]
        source: toml::de::Error,
    },
    #[error("could not initialize logging: {0}")]
    Logging(String),
    #[error("decoder failed: {0}")]
    Decoder(String),
    #[error("frame sink failed: {0}")]
    Sink(String),
    #[error("{0} thread panicked")]
    ThreadPanic(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
