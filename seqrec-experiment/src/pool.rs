use crate::io::PoolSource;
use rand::Rng;
use seqrec_core::{Contrast, Error, Result, Side, Speaker, TokenRef};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerTokens {
    pub speaker: Speaker,
    pub tokens: Vec<TokenRef>,
}

/// Tokens of one contrast side, partitioned by speaker in configured order.
///
/// Every speaker holds at least one token; `build` refuses anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StimulusPool {
    side: Side,
    location: PathBuf,
    speakers: Vec<SpeakerTokens>,
}

impl StimulusPool {
    pub fn build<S: PoolSource + ?Sized>(
        source: &S,
        contrast: &Contrast,
        side: Side,
        speakers: &[Speaker],
    ) -> Result<Self> {
        let item = contrast.item(side);
        let location = source.location(item, side);
        let tokens = source.list_tokens(item, side)?;
        Self::from_tokens(side, location, speakers, tokens)
    }

    /// Partitions identifiers by speaker-label membership in the file name.
    ///
    /// A file naming two speakers lands in both partitions; a file naming
    /// none is dropped.
    pub fn from_tokens(
        side: Side,
        location: PathBuf,
        speakers: &[Speaker],
        mut tokens: Vec<TokenRef>,
    ) -> Result<Self> {
        if tokens.is_empty() || speakers.is_empty() {
            return Err(Error::EmptyPool { location });
        }
        tokens.sort_by(|a, b| a.path().cmp(b.path()));

        let file_name = |t: &TokenRef| {
            t.path()
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default()
        };

        let mut partitions = Vec::with_capacity(speakers.len());
        for speaker in speakers {
            let owned: Vec<TokenRef> = tokens
                .iter()
                .filter(|t| speaker.matches(&file_name(*t)))
                .cloned()
                .collect();
            if owned.is_empty() {
                return Err(Error::SpeakerMissing {
                    location,
                    speaker: speaker.label().to_string(),
                });
            }
            partitions.push(SpeakerTokens {
                speaker: speaker.clone(),
                tokens: owned,
            });
        }

        let dropped: Vec<String> = tokens
            .iter()
            .map(file_name)
            .filter(|name| !speakers.iter().any(|s| s.matches(name)))
            .collect();
        if !dropped.is_empty() {
            warn!(
                "{} file(s) in {} match no configured speaker and were ignored: {:?}",
                dropped.len(),
                location.display(),
                dropped
            );
        }
        debug!(
            "side {} pool at {}: {} speaker(s), {} token(s)",
            side,
            location.display(),
            partitions.len(),
            partitions.iter().map(|p| p.tokens.len()).sum::<usize>()
        );

        Ok(Self {
            side,
            location,
            speakers: partitions,
        })
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn speakers(&self) -> &[SpeakerTokens] {
        &self.speakers
    }

    pub fn speaker_count(&self) -> usize {
        self.speakers.len()
    }

    /// Length of the longest speaker partition; the token rotation wraps here.
    pub fn max_token_count(&self) -> usize {
        self.speakers
            .iter()
            .map(|s| s.tokens.len())
            .max()
            .unwrap_or(0)
    }

    /// Token at a rotation position. Shorter partitions wrap onto their own tokens.
    pub fn token(&self, speaker_index: usize, token_index: usize) -> &TokenRef {
        let speaker = &self.speakers[speaker_index % self.speakers.len()];
        &speaker.tokens[token_index % speaker.tokens.len()]
    }

    /// Uniform speaker, then a uniform token of that speaker.
    pub fn random_token<R: Rng + ?Sized>(&self, rng: &mut R) -> &TokenRef {
        let speaker = &self.speakers[rng.random_range(0..self.speakers.len())];
        &speaker.tokens[rng.random_range(0..speaker.tokens.len())]
    }
}

/// The A and B pools of one contrast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidePools {
    pub a: StimulusPool,
    pub b: StimulusPool,
}

impl SidePools {
    pub fn build<S: PoolSource + ?Sized>(
        source: &S,
        contrast: &Contrast,
        speakers: &[Speaker],
    ) -> Result<Self> {
        Ok(Self {
            a: StimulusPool::build(source, contrast, Side::A, speakers)?,
            b: StimulusPool::build(source, contrast, Side::B, speakers)?,
        })
    }

    pub fn get(&self, side: Side) -> &StimulusPool {
        match side {
            Side::A => &self.a,
            Side::B => &self.b,
        }
    }
}

/// Stimulus folders laid out as `<root>/<item>_<A|B>/`
#[derive(Debug, Clone)]
pub struct DirectoryPoolSource {
    root: PathBuf,
}

impl DirectoryPoolSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the side folders for every contrast and returns the ones created.
    pub fn scaffold(&self, contrasts: &[Contrast]) -> Result<Vec<PathBuf>> {
        let mut created = Vec::new();
        for contrast in contrasts {
            for side in Side::BOTH {
                let dir = self.location(contrast.item(side), side);
                if !dir.is_dir() {
                    std::fs::create_dir_all(&dir)?;
                    created.push(dir);
                }
            }
        }
        Ok(created)
    }
}

impl PoolSource for DirectoryPoolSource {
    fn location(&self, item: &str, side: Side) -> PathBuf {
        self.root.join(format!("{item}_{side}"))
    }

    fn list_tokens(&self, item: &str, side: Side) -> Result<Vec<TokenRef>> {
        let location = self.location(item, side);
        let entries = match std::fs::read_dir(&location) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::PoolNotFound { location });
            }
            Err(e) => return Err(e.into()),
        };

        let mut tokens = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                tokens.push(TokenRef::new(entry.path()));
            }
        }
        Ok(tokens)
    }
}
