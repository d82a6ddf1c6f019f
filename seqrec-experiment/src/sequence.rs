//! Turns abstract templates into concrete, speaker/token-balanced sequences.
//!
//! Each side owns a `RotationCursor` that walks its pool speaker-first:
//! `(spk0,tok0) (spk1,tok0) .. (spkN,tok0) (spk0,tok1) ..`. Cursors carry over
//! from one template to the next, so across the whole template set every
//! (speaker, token) pair of a side is used once before any pair repeats.

use crate::pool::{SidePools, StimulusPool};
use crate::template::{Template, TemplateSet};
use seqrec_core::{Sequence, Side, TokenRef};
use std::collections::BTreeMap;
use tracing::debug;

/// Sequences grouped by level (symbol count)
pub type Levels = BTreeMap<usize, Vec<Sequence>>;

/// Rotation position within one side's pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RotationCursor {
    pub speaker_index: usize,
    pub token_index: usize,
}

impl RotationCursor {
    pub const START: RotationCursor = RotationCursor {
        speaker_index: 0,
        token_index: 0,
    };

    pub fn resolve<'p>(&self, pool: &'p StimulusPool) -> &'p TokenRef {
        pool.token(self.speaker_index, self.token_index)
    }

    /// Next speaker; after the last speaker, back to the first with the next token.
    pub fn advanced(self, pool: &StimulusPool) -> RotationCursor {
        let mut next = RotationCursor {
            speaker_index: self.speaker_index + 1,
            token_index: self.token_index,
        };
        if next.speaker_index > pool.speaker_count().saturating_sub(1) {
            next.speaker_index = 0;
            next.token_index += 1;
        }
        if next.token_index > pool.max_token_count().saturating_sub(1) {
            next.token_index = 0;
        }
        next
    }
}

/// Resolves the token under `cursor` and returns it with the advanced cursor.
pub fn next_token(pool: &StimulusPool, cursor: RotationCursor) -> (TokenRef, RotationCursor) {
    (cursor.resolve(pool).clone(), cursor.advanced(pool))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SideCursors {
    pub a: RotationCursor,
    pub b: RotationCursor,
}

impl SideCursors {
    pub fn get(&self, side: Side) -> RotationCursor {
        match side {
            Side::A => self.a,
            Side::B => self.b,
        }
    }

    pub fn set(&mut self, side: Side, cursor: RotationCursor) {
        match side {
            Side::A => self.a = cursor,
            Side::B => self.b = cursor,
        }
    }
}

pub struct SequenceGenerator<'p> {
    pools: &'p SidePools,
    cursors: SideCursors,
}

impl<'p> SequenceGenerator<'p> {
    pub fn new(pools: &'p SidePools) -> Self {
        Self::with_cursors(pools, SideCursors::default())
    }

    /// Starts from explicit cursor positions, e.g. to resume a rotation.
    pub fn with_cursors(pools: &'p SidePools, cursors: SideCursors) -> Self {
        Self { pools, cursors }
    }

    pub fn cursors(&self) -> SideCursors {
        self.cursors
    }

    pub fn build(&mut self, template: &Template) -> Sequence {
        let mut tokens = Vec::with_capacity(template.level());
        for &side in template.symbols() {
            let (token, cursor) = next_token(self.pools.get(side), self.cursors.get(side));
            self.cursors.set(side, cursor);
            tokens.push(token);
        }
        Sequence {
            template: template.pattern().to_string(),
            tokens,
        }
    }

    pub fn generate(&mut self, templates: &TemplateSet) -> Levels {
        let mut levels = Levels::new();
        for template in templates.templates() {
            let sequence = self.build(template);
            levels.entry(sequence.level()).or_default().push(sequence);
        }
        debug!(
            "generated {} sequence(s) over levels {:?}",
            templates.len(),
            levels.keys().collect::<Vec<_>>()
        );
        levels
    }
}

pub fn generate(pools: &SidePools, templates: &TemplateSet) -> Levels {
    SequenceGenerator::new(pools).generate(templates)
}
