use crate::timer::Timer;
use std::time::Duration;

/// Point in time after which a response window is closed.
///
/// `None` as the expiry means the window never closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    expires_at_ns: Option<u64>,
}

impl Deadline {
    pub fn after<T: Timer>(timer: &T, timeout: Option<Duration>) -> Self {
        let expires_at_ns =
            timeout.map(|t| timer.now().saturating_add(t.as_nanos().min(u64::MAX as u128) as u64));
        Self { expires_at_ns }
    }

    pub fn unbounded() -> Self {
        Self {
            expires_at_ns: None,
        }
    }

    pub fn is_bounded(&self) -> bool {
        self.expires_at_ns.is_some()
    }

    /// Time left before expiry; `None` when unbounded.
    pub fn remaining<T: Timer>(&self, timer: &T) -> Option<Duration> {
        self.expires_at_ns
            .map(|at| Duration::from_nanos(at.saturating_sub(timer.now())))
    }

    pub fn is_expired<T: Timer>(&self, timer: &T) -> bool {
        match self.expires_at_ns {
            Some(at) => timer.now() >= at,
            None => false,
        }
    }
}
