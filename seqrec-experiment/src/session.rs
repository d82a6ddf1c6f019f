use crate::config::ExperimentConfig;
use crate::io::{AudioPlayer, Display, InputDevice, PoolSource, PromptOptions, ResultsSink};
use crate::pool::SidePools;
use crate::sequence::{generate, Levels};
use crate::staircase::StaircaseController;
use crate::template::TemplateSet;
use crate::trial::{TrialRunner, TrialTiming};
use rand::Rng;
use rand::seq::SliceRandom;
use seqrec_core::{Contrast, Key, Phase, Result, Sequence, SessionPhase, Trial};
use seqrec_timing::Timer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, error, info};

/// Level-complete melody: (frequency, wait before the next note in ms).
const CHIME: [(f32, u64); 7] = [
    (329.63, 160),
    (329.63, 200),
    (329.63, 300),
    (261.63, 160),
    (329.63, 300),
    (392.00, 500),
    (196.00, 400),
];
const CHIME_NOTE: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContrastResult {
    pub contrast: Contrast,
    pub familiarization_plays: u32,
    pub staircase_trials: usize,
    /// Trials per level in their shuffled presentation order.
    pub levels: BTreeMap<usize, Vec<Trial>>,
}

/// Everything recorded for one participant; handed to the sink once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub participant_id: String,
    pub contrasts: Vec<ContrastResult>,
}

impl SessionResult {
    pub fn trial_count(&self) -> usize {
        self.contrasts
            .iter()
            .flat_map(|c| c.levels.values())
            .map(Vec::len)
            .sum()
    }
}

/// The external devices a session talks to
pub struct Collaborators<P, D, I, S> {
    pub player: P,
    pub display: D,
    pub input: I,
    pub source: S,
}

pub struct SessionOrchestrator<P, D, I, S, T, R>
where
    P: AudioPlayer,
    D: Display,
    I: InputDevice,
    S: PoolSource,
    T: Timer,
    R: Rng,
{
    pub config: ExperimentConfig,
    pub templates: TemplateSet,
    pub player: P,
    pub display: D,
    pub input: I,
    pub source: S,
    pub timer: T,
    pub rng: R,
    pub phase: SessionPhase,
}

impl<P, D, I, S, T, R> SessionOrchestrator<P, D, I, S, T, R>
where
    P: AudioPlayer,
    D: Display,
    I: InputDevice,
    S: PoolSource,
    T: Timer,
    R: Rng,
{
    pub fn new(
        config: ExperimentConfig,
        templates: TemplateSet,
        collaborators: Collaborators<P, D, I, S>,
        timer: T,
        rng: R,
    ) -> Self {
        let Collaborators {
            player,
            display,
            input,
            source,
        } = collaborators;
        Self {
            config,
            templates,
            player,
            display,
            input,
            source,
            timer,
            rng,
            phase: SessionPhase::default(),
        }
    }

    /// Control contrast first, the others in a fresh random order.
    pub fn contrast_order(&mut self) -> Vec<Contrast> {
        let (control, mut rest): (Vec<Contrast>, Vec<Contrast>) =
            self.config.contrasts.iter().cloned().partition(|c| c.control);
        rest.shuffle(&mut self.rng);
        control.into_iter().chain(rest).collect()
    }

    /// Runs every contrast and appends the result to `sink` exactly once.
    ///
    /// Any error aborts the whole session after a diagnostic is shown; the
    /// sink is never called for an aborted session.
    pub fn run<K: ResultsSink + ?Sized>(
        &mut self,
        participant_id: &str,
        sink: &mut K,
    ) -> Result<SessionResult> {
        info!("session for participant '{}' started", participant_id);
        let started = self.timer.now();

        let outcome = self.run_contrasts(participant_id).and_then(|result| {
            sink.append_session(participant_id, &result)?;
            Ok(result)
        });

        match outcome {
            Ok(result) => {
                info!(
                    "session for '{}' complete: {} contrast(s), {} trial(s) in {:.1}s",
                    participant_id,
                    result.contrasts.len(),
                    result.trial_count(),
                    self.timer.elapsed(started).as_secs_f64()
                );
                self.display.show_prompt(
                    "The session is complete. Thank you!",
                    PromptOptions::timed(100),
                );
                Ok(result)
            }
            Err(e) => {
                error!("session aborted during {}: {}", self.phase, e);
                let text = if e.is_stimulus_error() {
                    format!("The stimulus folders are not ready.\n\n{e}")
                } else {
                    format!("The experiment cannot continue.\n\n{e}")
                };
                self.display.show_prompt(&text, PromptOptions::timed(100));
                Err(e)
            }
        }
    }

    fn run_contrasts(&mut self, participant_id: &str) -> Result<SessionResult> {
        let mut contrasts = Vec::new();
        for contrast in self.contrast_order() {
            contrasts.push(self.run_contrast(&contrast)?);
        }
        Ok(SessionResult {
            participant_id: participant_id.to_string(),
            contrasts,
        })
    }

    fn run_contrast(&mut self, contrast: &Contrast) -> Result<ContrastResult> {
        self.phase = SessionPhase::default();
        info!(
            "contrast {}{} starting",
            contrast,
            if contrast.control { " (control)" } else { "" }
        );
        let pools = SidePools::build(&self.source, contrast, &self.config.speakers)?;

        let familiarization_plays = self.familiarize(contrast, &pools)?;
        self.advance_phase();
        let staircase_trials = self.calibrate(contrast, &pools)?;
        self.advance_phase();
        let levels = self.recall(generate(&pools, &self.templates))?;
        self.advance_phase();

        Ok(ContrastResult {
            contrast: contrast.clone(),
            familiarization_plays,
            staircase_trials,
            levels,
        })
    }

    fn advance_phase(&mut self) {
        if let Some(next) = self.phase.next() {
            info!("phase {} -> {}", self.phase, next);
            self.phase = next;
        }
    }

    /// Next key pressed from now on. Participant-paced phases wait without bound.
    fn next_key(&mut self) -> Result<Key> {
        self.input.discard_pending();
        let timeout = if self.phase.participant_paced() {
            None
        } else {
            self.config.item_timeout()
        };
        loop {
            if let Some(key) = self.input.wait_for_key(timeout)? {
                return Ok(key);
            }
        }
    }

    fn prompt_and_wait(&mut self, text: &str) -> Result<()> {
        self.display.show_prompt(text, PromptOptions::self_paced());
        loop {
            let key = self.next_key()?;
            if self.config.keys.is_advance(&key) {
                break;
            }
        }
        self.display.clear();
        Ok(())
    }

    fn familiarize(&mut self, contrast: &Contrast, pools: &SidePools) -> Result<u32> {
        let keys = self.config.keys.clone();
        let required = self.config.forced_listen_count;
        self.display.show_prompt(
            &format!(
                "Press '{}' to hear {} and '{}' to hear {}.\nPress '{}' when you are ready to continue.",
                keys.side_a, contrast.a, keys.side_b, contrast.b, keys.advance
            ),
            PromptOptions::self_paced(),
        );

        let mut plays = 0u32;
        loop {
            let key = self.next_key()?;
            if let Some(side) = keys.side_for(&key) {
                let token = pools.get(side).random_token(&mut self.rng).clone();
                self.display.show_cue(side);
                let duration = self.player.play(&token)?;
                self.timer.sleep(duration);
                self.display.clear();
                plays += 1;
                debug!("familiarization play {}: {}", plays, token.short_id());
            } else if keys.is_advance(&key) {
                if plays >= required {
                    break;
                }
                debug!("advance ignored after {}/{} play(s)", plays, required);
            }
        }
        Ok(plays)
    }

    fn calibrate(&mut self, contrast: &Contrast, pools: &SidePools) -> Result<usize> {
        let keys = self.config.keys.clone();
        self.prompt_and_wait(&format!(
            "You will hear one word at a time.\nPress '{}' for {} and '{}' for {}.\nPress '{}' to start.",
            keys.side_a, contrast.a, keys.side_b, contrast.b, keys.advance
        ))?;

        let mut staircase = StaircaseController::new(self.config.staircase_cutoff);
        self.display.show_progress(staircase.progress());
        while !staircase.is_passed() {
            let trial = staircase.step(pools, &mut self.rng);
            let duration = self.player.play(&trial.token)?;
            self.timer.sleep(duration);

            let response = keys.side_for(&self.next_key()?);
            let correct = trial.is_correct(response);
            staircase.report(response);
            debug!(
                "staircase trial {}: shown {}, answered {:?}, streak {}/{}",
                staircase.trials(),
                trial.side,
                response,
                staircase.consecutive_correct(),
                staircase.cutoff()
            );
            self.display.show_feedback(correct, staircase.progress());
            self.timer.sleep(self.config.test_isi());
        }
        self.display.clear();
        Ok(staircase.trials())
    }

    fn recall(&mut self, levels: Levels) -> Result<BTreeMap<usize, Vec<Trial>>> {
        let keys = self.config.keys.clone();
        self.prompt_and_wait(&format!(
            "Now listen to each sequence and repeat it.\nAfter each word press '{}' or '{}'.\nPress '{}' to start.",
            keys.side_a, keys.side_b, keys.advance
        ))?;

        let timing = TrialTiming {
            item_gap: self.config.main_isi(),
            marker: self.config.marker,
            mode: self.config.response_mode,
        };
        let item_timeout = self.config.item_timeout();
        let post_trial = Duration::from_millis(self.config.post_trial_pause_ms);
        let level_pause = Duration::from_millis(self.config.level_pause_ms);

        let mut results = BTreeMap::new();
        for level in self.config.recall_levels.clone() {
            let Some(sequences) = levels.get(&level).filter(|s| !s.is_empty()) else {
                debug!("level {} has no sequences, skipped", level);
                continue;
            };
            let mut order: Vec<&Sequence> = sequences.iter().collect();
            order.shuffle(&mut self.rng);

            let mut trials = Vec::with_capacity(order.len());
            for sequence in order {
                let mut runner = TrialRunner::new(
                    &mut self.player,
                    &mut self.display,
                    &mut self.input,
                    &self.timer,
                    timing.clone(),
                );
                trials.push(runner.run(sequence, item_timeout)?);
                self.timer.sleep(post_trial);
            }
            info!("level {} done: {} trial(s)", level, trials.len());
            results.insert(level, trials);

            self.play_chime()?;
            self.timer.sleep(level_pause);
        }
        Ok(results)
    }

    fn play_chime(&mut self) -> Result<()> {
        for (frequency_hz, wait_ms) in CHIME {
            self.player.play_tone(frequency_hz, CHIME_NOTE)?;
            self.timer.sleep(Duration::from_millis(wait_ms));
        }
        Ok(())
    }
}
