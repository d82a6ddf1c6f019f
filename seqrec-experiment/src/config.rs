use seqrec_core::{Contrast, Error, Key, Result, Side, Speaker};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How playback and response windows are interleaved within one trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Play an item, then open its window; the end marker follows the last window.
    #[default]
    PerItem,
    /// Play the whole sequence and the end marker, then open one window per item.
    AfterSequence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyMap {
    pub side_a: Key,
    pub side_b: Key,
    pub advance: Key,
}

impl KeyMap {
    pub fn side_for(&self, key: &Key) -> Option<Side> {
        if *key == self.side_a {
            Some(Side::A)
        } else if *key == self.side_b {
            Some(Side::B)
        } else {
            None
        }
    }

    pub fn is_advance(&self, key: &Key) -> bool {
        *key == self.advance
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        Self {
            side_a: Key::new("a"),
            side_b: Key::new("b"),
            advance: Key::new("space"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToneSpec {
    pub frequency_hz: f32,
    pub duration_ms: u64,
}

impl ToneSpec {
    pub const fn new(frequency_hz: f32, duration_ms: u64) -> Self {
        Self {
            frequency_hz,
            duration_ms,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

impl Default for ToneSpec {
    fn default() -> Self {
        // E4
        Self::new(329.63, 300)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExperimentConfig {
    pub speakers: Vec<Speaker>,
    pub staircase_cutoff: u32,
    pub test_isi_ms: u64,
    pub main_isi_ms: u64,
    pub forced_listen_count: u32,
    pub item_timeout_ms: u64,
    /// Response windows never close when set.
    pub wait_indefinitely: bool,
    pub recall_levels: Vec<usize>,
    pub response_mode: ResponseMode,
    pub post_trial_pause_ms: u64,
    pub level_pause_ms: u64,
    // tables last so the file reads top-down
    pub contrasts: Vec<Contrast>,
    pub keys: KeyMap,
    pub marker: ToneSpec,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            speakers: Vec::new(),
            staircase_cutoff: 7,
            test_isi_ms: 600,
            main_isi_ms: 80,
            forced_listen_count: 0,
            item_timeout_ms: 5000,
            wait_indefinitely: false,
            recall_levels: vec![2, 3],
            response_mode: ResponseMode::default(),
            post_trial_pause_ms: 500,
            level_pause_ms: 1000,
            contrasts: Vec::new(),
            keys: KeyMap::default(),
            marker: ToneSpec::default(),
        }
    }
}

impl ExperimentConfig {
    /// Placeholder configuration written for a new installation.
    pub fn starter() -> Self {
        Self {
            speakers: vec![Speaker::new("_speaker1_"), Speaker::new("_speaker2_")],
            contrasts: vec![Contrast::new("itemA", "itemB")],
            ..Self::default()
        }
    }

    pub fn item_timeout(&self) -> Option<Duration> {
        if self.wait_indefinitely {
            None
        } else {
            Some(Duration::from_millis(self.item_timeout_ms))
        }
    }

    pub fn test_isi(&self) -> Duration {
        Duration::from_millis(self.test_isi_ms)
    }

    pub fn main_isi(&self) -> Duration {
        Duration::from_millis(self.main_isi_ms)
    }

    /// Checks the invariants serde cannot express. `origin` names the source in errors.
    pub fn validate(&self, origin: &Path) -> Result<()> {
        let fail = |reason: String| Error::ConfigParse {
            path: origin.to_path_buf(),
            reason,
        };

        if self.speakers.is_empty() {
            return Err(fail("at least one speaker is required".into()));
        }
        if let Some(blank) = self.speakers.iter().position(|s| s.label().is_empty()) {
            return Err(fail(format!("speaker #{} has an empty label", blank + 1)));
        }
        if self.contrasts.is_empty() {
            return Err(fail("at least one contrast is required".into()));
        }
        for contrast in &self.contrasts {
            if contrast.a.is_empty() || contrast.b.is_empty() {
                return Err(fail(format!("contrast {contrast} has an empty item")));
            }
        }
        if self.contrasts.iter().filter(|c| c.control).count() > 1 {
            return Err(fail("only one contrast may be marked as control".into()));
        }
        if self.staircase_cutoff == 0 {
            return Err(fail("staircase_cutoff must be at least 1".into()));
        }
        if self.recall_levels.is_empty() {
            return Err(fail("recall_levels must name at least one level".into()));
        }
        if self.keys.side_a == self.keys.side_b
            || self.keys.advance == self.keys.side_a
            || self.keys.advance == self.keys.side_b
        {
            return Err(fail("keys.side_a, keys.side_b and keys.advance must differ".into()));
        }
        Ok(())
    }
}

/// Persistence of the experiment configuration
pub trait ConfigStore {
    fn exists(&self) -> bool;
    fn load(&self) -> Result<ExperimentConfig>;
    fn save(&self, config: &ExperimentConfig) -> Result<()>;
}

/// Configuration stored as labeled key/value lines in a TOML file
#[derive(Debug, Clone)]
pub struct TomlConfigStore {
    path: PathBuf,
}

impl TomlConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn parse(&self, text: &str) -> Result<ExperimentConfig> {
        let config: ExperimentConfig = toml::from_str(text).map_err(|e| Error::ConfigParse {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        config.validate(&self.path)?;
        Ok(config)
    }
}

impl ConfigStore for TomlConfigStore {
    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn load(&self) -> Result<ExperimentConfig> {
        let text = std::fs::read_to_string(&self.path)?;
        self.parse(&text)
    }

    fn save(&self, config: &ExperimentConfig) -> Result<()> {
        let text = toml::to_string_pretty(config).map_err(|e| Error::ConfigParse {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}
