use crate::pool::SidePools;
use rand::Rng;
use seqrec_core::{Side, TokenRef};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaircaseState {
    Testing,
    Passed,
}

/// One 2AFC presentation drawn by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaircaseTrial {
    pub side: Side,
    pub token: TokenRef,
}

impl StaircaseTrial {
    pub fn is_correct(&self, response: Option<Side>) -> bool {
        response == Some(self.side)
    }
}

/// Pass gate requiring `cutoff` consecutive correct discriminations.
///
/// A single miss resets the streak to zero. `Passed` is terminal.
#[derive(Debug, Clone)]
pub struct StaircaseController {
    cutoff: u32,
    consecutive_correct: u32,
    state: StaircaseState,
    shown: Option<Side>,
    trials: usize,
}

impl StaircaseController {
    pub fn new(cutoff: u32) -> Self {
        Self {
            cutoff,
            consecutive_correct: 0,
            state: if cutoff == 0 {
                StaircaseState::Passed
            } else {
                StaircaseState::Testing
            },
            shown: None,
            trials: 0,
        }
    }

    pub fn cutoff(&self) -> u32 {
        self.cutoff
    }

    pub fn consecutive_correct(&self) -> u32 {
        self.consecutive_correct
    }

    pub fn state(&self) -> StaircaseState {
        self.state
    }

    pub fn is_passed(&self) -> bool {
        self.state == StaircaseState::Passed
    }

    /// Number of reports received so far.
    pub fn trials(&self) -> usize {
        self.trials
    }

    /// Fraction of the streak required to pass, for progress displays.
    pub fn progress(&self) -> f32 {
        if self.cutoff == 0 {
            1.0
        } else {
            self.consecutive_correct as f32 / self.cutoff as f32
        }
    }

    /// Draws a side, then a speaker, then a token, each uniformly at random.
    pub fn step<R: Rng + ?Sized>(&mut self, pools: &SidePools, rng: &mut R) -> StaircaseTrial {
        let side = if rng.random_bool(0.5) { Side::A } else { Side::B };
        let token = pools.get(side).random_token(rng).clone();
        self.shown = Some(side);
        StaircaseTrial { side, token }
    }

    /// Scores a response against the side last shown by `step`.
    ///
    /// `None` stands for a key that maps to neither side and counts as wrong.
    pub fn report(&mut self, response: Option<Side>) -> StaircaseState {
        let correct = matches!((self.shown.take(), response), (Some(shown), Some(r)) if shown == r);
        self.record(correct)
    }

    pub fn record(&mut self, correct: bool) -> StaircaseState {
        if self.is_passed() {
            return self.state;
        }
        self.trials += 1;

        if correct {
            self.consecutive_correct += 1;
            if self.consecutive_correct >= self.cutoff {
                self.state = StaircaseState::Passed;
                info!(
                    "staircase passed after {} trial(s), cutoff {}",
                    self.trials, self.cutoff
                );
            }
        } else {
            if self.consecutive_correct > 0 {
                debug!("staircase streak of {} reset", self.consecutive_correct);
            }
            self.consecutive_correct = 0;
        }
        self.state
    }
}
