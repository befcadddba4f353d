use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("can't read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("can't parse MIDI file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: midly::Error,
    },

    #[error("unsupported timing in MIDI file {}", .path.display())]
    UnsupportedTiming { path: PathBuf },

    #[error("no MIDI output ports found")]
    NoOutputPorts,

    #[error("no MIDI output port matches {0}")]
    NoMatchingPort(String),

    #[error("multiple MIDI output ports match {0}")]
    AmbiguousPort(String),

    #[error("MIDI output: {0}")]
    Midi(String),

    #[error("playback thread panicked")]
    PlaybackPanicked,
}
