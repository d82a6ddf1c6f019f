#![allow(dead_code)]

use rand::SeedableRng;
use rand::rngs::StdRng;
use seqrec_core::{Contrast, Error, Key, Result, Side, Speaker, TokenRef};
use seqrec_experiment::{
    AudioPlayer, Collaborators, DirectoryPoolSource, Display, ExperimentConfig, InputDevice,
    PromptOptions, ResultsSink, SessionOrchestrator, SessionResult, TemplateSet,
};
use seqrec_timing::ManualTimer;
use std::cell::Cell;
use std::collections::VecDeque;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

pub type Orchestrator =
    SessionOrchestrator<Player, Screen, Participant, DirectoryPoolSource, ManualTimer, StdRng>;

/// Side of a token, read from its `<item>_<A|B>` folder.
pub fn side_of(token: &TokenRef) -> Option<Side> {
    let folder = token.short_id();
    let folder = folder.split('/').next()?;
    folder.chars().last().and_then(Side::from_symbol)
}

pub struct Player {
    pub played: Vec<String>,
    pub tones: Vec<f32>,
    pub last_side: Rc<Cell<Option<Side>>>,
    pub item_duration: Duration,
}

impl AudioPlayer for Player {
    fn play(&mut self, token: &TokenRef) -> Result<Duration> {
        self.played.push(token.short_id());
        self.last_side.set(side_of(token));
        Ok(self.item_duration)
    }

    fn play_tone(&mut self, frequency_hz: f32, duration: Duration) -> Result<Duration> {
        self.tones.push(frequency_hz);
        Ok(duration)
    }
}

#[derive(Default)]
pub struct Screen {
    pub prompts: Vec<(String, PromptOptions)>,
    pub cues: Vec<Side>,
    pub feedback: Vec<bool>,
    pub progress: Vec<f32>,
    pub windows: Vec<(usize, usize)>,
}

impl Display for Screen {
    fn show_prompt(&mut self, text: &str, options: PromptOptions) {
        self.prompts.push((text.to_string(), options));
    }

    fn show_progress(&mut self, fraction: f32) {
        self.progress.push(fraction);
    }

    fn show_response_progress(&mut self, item_index: usize, total: usize) {
        self.windows.push((item_index, total));
    }

    fn show_cue(&mut self, side: Side) {
        self.cues.push(side);
    }

    fn show_feedback(&mut self, correct: bool, fraction: f32) {
        self.feedback.push(correct);
        self.progress.push(fraction);
    }
}

#[derive(Debug, Clone)]
pub enum Step {
    /// Press a key after a delay.
    Press(&'static str, Duration),
    /// Press the key for the side of the last token heard.
    Echo,
    /// Say nothing until the window closes.
    Silent,
}

pub fn press(key: &'static str) -> Step {
    Step::Press(key, Duration::from_millis(250))
}

/// Scripted participant; fails with `Error::Input` once the script runs out.
pub struct Participant {
    pub timer: ManualTimer,
    pub script: VecDeque<Step>,
    pub last_side: Rc<Cell<Option<Side>>>,
}

impl InputDevice for Participant {
    fn wait_for_key(&mut self, timeout: Option<Duration>) -> Result<Option<Key>> {
        let step = self
            .script
            .pop_front()
            .ok_or_else(|| Error::Input("participant script exhausted".into()))?;
        match step {
            Step::Press(key, delay) => {
                if let Some(limit) = timeout.filter(|t| delay > *t) {
                    self.timer.advance(limit);
                    self.script.push_front(Step::Press(key, delay - limit));
                    return Ok(None);
                }
                self.timer.advance(delay);
                Ok(Some(Key::new(key)))
            }
            Step::Echo => {
                self.timer.advance(Duration::from_millis(300));
                let key = match self.last_side.get() {
                    Some(Side::A) => "a",
                    Some(Side::B) => "b",
                    None => "x",
                };
                Ok(Some(Key::new(key)))
            }
            Step::Silent => match timeout {
                Some(limit) => {
                    self.timer.advance(limit);
                    Ok(None)
                }
                None => Err(Error::Input("silent step in an unbounded wait".into())),
            },
        }
    }
}

#[derive(Default)]
pub struct Sink {
    pub appended: Vec<(String, SessionResult)>,
    pub fail: bool,
}

impl ResultsSink for Sink {
    fn append_session(&mut self, participant_id: &str, result: &SessionResult) -> Result<()> {
        if self.fail {
            return Err(Error::Results("disk full".into()));
        }
        self.appended.push((participant_id.to_string(), result.clone()));
        Ok(())
    }
}

pub fn speakers() -> Vec<Speaker> {
    vec![Speaker::new("_erica_"), Speaker::new("_josh_")]
}

/// Writes `<item>_<side>/<item>_<speaker>_<n>_<side>.wav` for both speakers, two tokens each.
pub fn populate(root: &Path, contrast: &Contrast) {
    for side in Side::BOTH {
        let item = contrast.item(side);
        let dir = root.join(format!("{item}_{side}"));
        std::fs::create_dir_all(&dir).unwrap();
        for speaker in ["erica", "josh"] {
            for n in 1..=2 {
                std::fs::write(dir.join(format!("{item}_{speaker}_{n}_{side}.wav")), b"").unwrap();
            }
        }
    }
}

pub fn config(contrasts: Vec<Contrast>) -> ExperimentConfig {
    ExperimentConfig {
        speakers: speakers(),
        contrasts,
        staircase_cutoff: 2,
        forced_listen_count: 1,
        ..ExperimentConfig::default()
    }
}

pub fn orchestrator(
    config: ExperimentConfig,
    templates: &[&str],
    root: &Path,
    script: Vec<Step>,
    seed: u64,
) -> Orchestrator {
    let timer = ManualTimer::new();
    let last_side = Rc::new(Cell::new(None));
    SessionOrchestrator::new(
        config,
        TemplateSet::new(templates.iter().copied()).unwrap(),
        Collaborators {
            player: Player {
                played: Vec::new(),
                tones: Vec::new(),
                last_side: last_side.clone(),
                item_duration: Duration::from_millis(400),
            },
            display: Screen::default(),
            input: Participant {
                timer: timer.clone(),
                script: script.into(),
                last_side,
            },
            source: DirectoryPoolSource::new(root),
        },
        timer,
        StdRng::seed_from_u64(seed),
    )
}

/// Keys for one contrast: one listen, advance, staircase passed with `cutoff`
/// echoes, advance into recall, then the given recall steps.
pub fn contrast_script(cutoff: usize, recall: impl IntoIterator<Item = Step>) -> Vec<Step> {
    let mut script = vec![press("a"), press("space"), press("space")];
    script.extend(std::iter::repeat_n(Step::Echo, cutoff));
    script.push(press("space"));
    script.extend(recall);
    script
}
