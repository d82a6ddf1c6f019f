pub mod error;
pub mod phase;
pub mod stimulus;
pub mod trial;

pub use error::{Error, Result};
pub use phase::{Phase, SessionPhase};
pub use stimulus::{Contrast, Key, Side, Speaker, TokenRef};
pub use trial::{ItemResponse, Sequence, Trial};
