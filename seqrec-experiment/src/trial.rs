use crate::config::{ResponseMode, ToneSpec};
use crate::io::{AudioPlayer, Display, InputDevice};
use seqrec_core::{ItemResponse, Result, Sequence, TokenRef, Trial};
use seqrec_timing::{Deadline, Timer};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct TrialTiming {
    /// Silence after each item's natural duration.
    pub item_gap: Duration,
    pub marker: ToneSpec,
    pub mode: ResponseMode,
}

/// Plays one sequence and collects one bounded response per item
pub struct TrialRunner<'a, P, D, I, T>
where
    P: AudioPlayer,
    D: Display,
    I: InputDevice,
    T: Timer,
{
    pub player: &'a mut P,
    pub display: &'a mut D,
    pub input: &'a mut I,
    pub timer: &'a T,
    pub timing: TrialTiming,
}

impl<'a, P, D, I, T> TrialRunner<'a, P, D, I, T>
where
    P: AudioPlayer,
    D: Display,
    I: InputDevice,
    T: Timer,
{
    pub fn new(
        player: &'a mut P,
        display: &'a mut D,
        input: &'a mut I,
        timer: &'a T,
        timing: TrialTiming,
    ) -> Self {
        Self {
            player,
            display,
            input,
            timer,
            timing,
        }
    }

    /// Runs the sequence. `item_timeout` of `None` waits for every key without bound.
    ///
    /// The returned trial always holds exactly one record per item, in
    /// presentation order; expired windows contribute placeholder records.
    pub fn run(&mut self, sequence: &Sequence, item_timeout: Option<Duration>) -> Result<Trial> {
        let total = sequence.len();
        let mut responses = Vec::with_capacity(total);
        debug!(
            "trial {} ({} item(s), {:?})",
            sequence.template, total, self.timing.mode
        );

        match self.timing.mode {
            ResponseMode::PerItem => {
                for (index, token) in sequence.tokens.iter().enumerate() {
                    self.play_item(token)?;
                    responses.push(self.collect(token, index, total, item_timeout)?);
                }
                self.display.show_response_progress(total, total);
                self.play_marker()?;
            }
            ResponseMode::AfterSequence => {
                for token in &sequence.tokens {
                    self.play_item(token)?;
                }
                self.play_marker()?;
                for (index, token) in sequence.tokens.iter().enumerate() {
                    responses.push(self.collect(token, index, total, item_timeout)?);
                }
                self.display.show_response_progress(total, total);
            }
        }

        Ok(Trial {
            level: sequence.level(),
            template: sequence.template.clone(),
            responses,
        })
    }

    fn play_item(&mut self, token: &TokenRef) -> Result<()> {
        let duration = self.player.play(token)?;
        self.timer.sleep(duration + self.timing.item_gap);
        Ok(())
    }

    fn play_marker(&mut self) -> Result<()> {
        let marker = self.timing.marker;
        let duration = self
            .player
            .play_tone(marker.frequency_hz, marker.duration())?;
        self.timer.sleep(duration);
        Ok(())
    }

    /// Opens one response window; at most one key is accepted.
    fn collect(
        &mut self,
        token: &TokenRef,
        index: usize,
        total: usize,
        timeout: Option<Duration>,
    ) -> Result<ItemResponse> {
        let stimulus = token.short_id();
        self.display.show_response_progress(index, total);
        // only keys pressed inside this window count
        self.input.discard_pending();

        let opened = self.timer.now();
        let deadline = Deadline::after(self.timer, timeout);
        loop {
            if deadline.is_expired(self.timer) {
                debug!("no response for {} within {:?}", stimulus, timeout);
                return Ok(ItemResponse::timed_out(stimulus));
            }
            match self.input.wait_for_key(deadline.remaining(self.timer))? {
                Some(key) if deadline.is_expired(self.timer) => {
                    warn!("key '{}' arrived after the window for {} closed", key, stimulus);
                    return Ok(ItemResponse::timed_out(stimulus));
                }
                Some(key) => {
                    let reaction_ns = self.timer.now().saturating_sub(opened);
                    debug!(
                        "{} -> '{}' after {:.1} ms",
                        stimulus,
                        key,
                        reaction_ns as f64 / 1_000_000.0
                    );
                    return Ok(ItemResponse::answered(stimulus, key, reaction_ns));
                }
                // the device woke early; the deadline check above decides
                None => continue,
            }
        }
    }
}
