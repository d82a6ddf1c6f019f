use crate::stimulus::{Key, TokenRef};
use serde::{Deserialize, Serialize};

/// Concrete stimulus sequence built from one template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub template: String,
    pub tokens: Vec<TokenRef>,
}

impl Sequence {
    /// Level is the symbol count of the originating template.
    pub fn level(&self) -> usize {
        self.tokens.len()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Recorded response for one item of a played sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemResponse {
    pub stimulus: String,
    pub key: Option<Key>,
    pub responded: bool,
    pub reaction_time_ns: Option<u64>,
}

impl ItemResponse {
    pub fn answered(stimulus: String, key: Key, reaction_time_ns: u64) -> Self {
        Self {
            stimulus,
            key: Some(key),
            responded: true,
            reaction_time_ns: Some(reaction_time_ns),
        }
    }

    pub fn timed_out(stimulus: String) -> Self {
        Self {
            stimulus,
            key: None,
            responded: false,
            reaction_time_ns: None,
        }
    }
}

/// One played sequence with its responses in presentation order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trial {
    pub level: usize,
    pub template: String,
    pub responses: Vec<ItemResponse>,
}

impl Trial {
    pub fn response_count(&self) -> usize {
        self.responses.iter().filter(|r| r.responded).count()
    }
}
