//! Collaborator seams between the experiment logic and the outside world.
//!
//! Nothing in this crate touches a window, an audio device or a keyboard
//! directly; the binary supplies implementations of these traits and the
//! integration tests supply scripted ones.

use crate::session::SessionResult;
use seqrec_core::{Key, Result, Side, TokenRef};
use std::path::PathBuf;
use std::time::Duration;

/// Audio output
///
/// Both calls start playback and return the natural duration; the caller
/// owns the wait so timing stays on one clock.
pub trait AudioPlayer {
    fn play(&mut self, token: &TokenRef) -> Result<Duration>;
    fn play_tone(&mut self, frequency_hz: f32, duration: Duration) -> Result<Duration>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptOptions {
    /// The participant dismisses the prompt with the advance key.
    pub self_paced: bool,
    /// Minimum number of frames the prompt stays up.
    pub min_frames: u32,
}

impl PromptOptions {
    pub const fn timed(min_frames: u32) -> Self {
        Self {
            self_paced: false,
            min_frames,
        }
    }

    pub const fn self_paced() -> Self {
        Self {
            self_paced: true,
            min_frames: 30,
        }
    }
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self::timed(30)
    }
}

/// Visual feedback. Display failures never abort a session, so these are infallible.
pub trait Display {
    fn show_prompt(&mut self, text: &str, options: PromptOptions);
    fn show_progress(&mut self, fraction: f32);
    fn show_response_progress(&mut self, item_index: usize, total: usize);

    fn show_cue(&mut self, _side: Side) {}

    fn show_feedback(&mut self, _correct: bool, fraction: f32) {
        self.show_progress(fraction);
    }

    fn clear(&mut self) {}
}

pub trait InputDevice {
    /// Waits for one key event. `None` timeout waits without bound; a bounded
    /// wait returns `Ok(None)` once the timeout elapses.
    fn wait_for_key(&mut self, timeout: Option<Duration>) -> Result<Option<Key>>;

    /// Drops key events already received but not yet read.
    fn discard_pending(&mut self) {}
}

/// Enumerates the stimulus identifiers for one side of a contrast
pub trait PoolSource {
    /// Where the side's stimuli are expected, for diagnostics.
    fn location(&self, item: &str, side: Side) -> PathBuf;

    /// Fails with `PoolNotFound` when the source is absent. An empty list is valid here.
    fn list_tokens(&self, item: &str, side: Side) -> Result<Vec<TokenRef>>;
}

/// Append-only results storage, one call per completed session
pub trait ResultsSink {
    fn append_session(&mut self, participant_id: &str, result: &SessionResult) -> Result<()>;
}
