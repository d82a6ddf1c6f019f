//! Error taxonomy shared by every seqrec crate.
//!
//! Structural problems (configuration, stimulus folders, unreadable audio)
//! abort the session. A response window that expires is not an error: it is
//! recorded as an `ItemResponse` with `responded == false`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Stored configuration is malformed or fails validation
    #[error("configuration at {} is malformed: {reason}", path.display())]
    ConfigParse { path: PathBuf, reason: String },

    /// The folder holding one side of a contrast does not exist
    #[error("stimulus folder not found, expected it at {}", location.display())]
    PoolNotFound { location: PathBuf },

    /// The folder exists but holds no usable stimuli
    #[error("stimulus folder {} is empty, put the audio files there", location.display())]
    EmptyPool { location: PathBuf },

    /// A configured speaker has no token in a side folder
    #[error("no stimuli for speaker '{speaker}' in {}", location.display())]
    SpeakerMissing { location: PathBuf, speaker: String },

    /// A template line uses symbols outside {A, B}
    #[error("invalid template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },

    /// The audio source for a token could not be read
    #[error("playback failed for {}: {reason}", path.display())]
    PlaybackFailure { path: PathBuf, reason: String },

    /// The input device stopped delivering events
    #[error("input device error: {0}")]
    Input(String),

    /// Results could not be serialized or written
    #[error("results could not be written: {0}")]
    Results(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors that name a missing or unusable stimulus location.
    ///
    /// These get a diagnostic that points the experimenter at the folders.
    pub fn is_stimulus_error(&self) -> bool {
        matches!(
            self,
            Error::PoolNotFound { .. } | Error::EmptyPool { .. } | Error::SpeakerMissing { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
