use crate::error::LabError;
use std::time::Duration;

/// Handle for a results reveal the presentation layer has scheduled.
///
/// The core never waits. The caller starts its own timer and, when it
/// fires, hands the token back to the session. A reset or an explicit cancel
/// in between makes the token stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealToken {
    id: u64,
    epoch: u64,
    pub delay: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct RevealGate {
    epoch: u64,
    next_id: u64,
    pending: Option<u64>,
}

impl RevealGate {
    /// Arms a new reveal, replacing any pending one.
    pub fn arm(&mut self, delay: Duration) -> RevealToken {
        self.next_id += 1;
        self.pending = Some(self.next_id);
        RevealToken {
            id: self.next_id,
            epoch: self.epoch,
            delay,
        }
    }

    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Called on session reset: every outstanding token goes stale.
    pub fn invalidate(&mut self) {
        self.epoch += 1;
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Consumes the pending reveal if `token` still refers to it.
    pub fn claim(&mut self, token: &RevealToken) -> Result<(), LabError> {
        if token.epoch != self.epoch || self.pending != Some(token.id) {
            return Err(LabError::RevealCancelled);
        }
        self.pending = None;
        Ok(())
    }
}
