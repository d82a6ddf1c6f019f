pub mod config;
pub mod io;
pub mod pool;
pub mod results;
pub mod sequence;
pub mod session;
pub mod staircase;
pub mod template;
pub mod trial;

pub use config::{ConfigStore, ExperimentConfig, KeyMap, ResponseMode, ToneSpec, TomlConfigStore};
pub use io::{AudioPlayer, Display, InputDevice, PoolSource, PromptOptions, ResultsSink};
pub use pool::{DirectoryPoolSource, SidePools, StimulusPool};
pub use results::JsonResultsSink;
pub use sequence::{generate, Levels, RotationCursor, SequenceGenerator, SideCursors};
pub use session::{Collaborators, ContrastResult, SessionOrchestrator, SessionResult};
pub use staircase::{StaircaseController, StaircaseState, StaircaseTrial};
pub use template::{Template, TemplateSet};
pub use trial::{TrialRunner, TrialTiming};
