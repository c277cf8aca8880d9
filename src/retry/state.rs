//! The retry session state machine.

/// Where a retry session is in its lifecycle.
///
/// ```text
/// Attempting(0) --ok--> Succeeded
/// Attempting(n) --err, n + 1 == max--> Failed
/// Attempting(n) --err--> Waiting(n) --delay elapsed--> Attempting(n + 1)
/// ```
///
/// Transitions are pure. An event that does not apply to the current state
/// leaves it unchanged, and `Succeeded` / `Failed` never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// Attempt `n` (0-indexed) is running.
    Attempting(u32),
    /// Attempt `n` failed; waiting out the backoff before attempt `n + 1`.
    Waiting(u32),
    /// An attempt succeeded.
    Succeeded,
    /// The final attempt failed.
    Failed,
}

impl RetryState {
    /// The state every session starts in.
    pub const fn initial() -> Self {
        Self::Attempting(0)
    }

    /// The running attempt succeeded.
    pub fn on_success(self) -> Self {
        match self {
            Self::Attempting(_) => Self::Succeeded,
            other => other,
        }
    }

    /// The running attempt failed, with `max_attempts` total allowed.
    pub fn on_failure(self, max_attempts: u32) -> Self {
        match self {
            Self::Attempting(n) if n.saturating_add(1) >= max_attempts => Self::Failed,
            Self::Attempting(n) => Self::Waiting(n),
            other => other,
        }
    }

    /// The backoff delay elapsed.
    pub fn on_delay_elapsed(self) -> Self {
        match self {
            Self::Waiting(n) => Self::Attempting(n.saturating_add(1)),
            other => other,
        }
    }

    /// Returns true for `Succeeded` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}
