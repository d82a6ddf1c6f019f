/// Defines the phases a contrast goes through and their behavior
pub trait Phase: Copy + Clone + PartialEq + Send + Sync + std::fmt::Debug + Default {
    /// Whether waits in this phase are paced by the participant (no deadline).
    fn participant_paced(&self) -> bool;
    fn next(&self) -> Option<Self>;
}

#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Familiarization,
    Staircase,
    Recall,
    Complete,
}

impl Phase for SessionPhase {
    fn participant_paced(&self) -> bool {
        matches!(self, Self::Familiarization | Self::Staircase)
    }

    fn next(&self) -> Option<Self> {
        use SessionPhase::*;
        Some(match self {
            Familiarization => Staircase,
            Staircase => Recall,
            Recall => Complete,
            Complete => return None,
        })
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionPhase::Familiarization => "familiarization",
            SessionPhase::Staircase => "staircase",
            SessionPhase::Recall => "recall",
            SessionPhase::Complete => "complete",
        };
        f.write_str(name)
    }
}
