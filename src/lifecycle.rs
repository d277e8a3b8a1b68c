//! Per-server lifecycle
//!
//! A server is `Active` with a count of consecutive failed checks, or
//! `Inactive` for good. Only the fleet controller mutates this.

/// Consecutive failed checks after which a server is retired.
pub const UNREACHABLE_THRESHOLD: u8 = 3;

/// Why a server stopped being checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetireReason {
    /// Failed `UNREACHABLE_THRESHOLD` checks in a row
    Unreachable,
    /// We shut it down ourselves
    ShutDown,
    /// Marked `disabled` in the config
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Active { unreachable_count: u8 },
    Inactive(RetireReason),
}

/// Result of recording a failed check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Still active, with the new count
    Counted(u8),
    /// This failure hit the threshold
    Retired,
    /// Already inactive; nothing changed
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerLifecycle {
    state: LifecycleState,
    last_known_map: Option<String>,
}

impl ServerLifecycle {
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Active { unreachable_count: 0 },
            last_known_map: None,
        }
    }

    /// A lifecycle that starts retired (disabled servers).
    pub fn disabled() -> Self {
        Self {
            state: LifecycleState::Inactive(RetireReason::Disabled),
            last_known_map: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_inactive(&self) -> bool {
        matches!(self.state, LifecycleState::Inactive(_))
    }

    pub fn unreachable_count(&self) -> u8 {
        match self.state {
            LifecycleState::Active { unreachable_count } => unreachable_count,
            LifecycleState::Inactive(RetireReason::Unreachable) => UNREACHABLE_THRESHOLD,
            LifecycleState::Inactive(_) => 0,
        }
    }

    pub fn last_known_map(&self) -> Option<&str> {
        self.last_known_map.as_deref()
    }

    pub fn set_last_known_map(&mut self, map: impl Into<String>) {
        self.last_known_map = Some(map.into());
    }

    /// The server answered; forget earlier failures.
    pub fn record_success(&mut self) {
        if let LifecycleState::Active { unreachable_count } = &mut self.state {
            *unreachable_count = 0;
        }
    }

    /// The server could not be checked this tick.
    pub fn record_failure(&mut self) -> FailureOutcome {
        match self.state {
            LifecycleState::Inactive(_) => FailureOutcome::Ignored,
            LifecycleState::Active { unreachable_count } => {
                let count = unreachable_count + 1;
                if count >= UNREACHABLE_THRESHOLD {
                    self.state = LifecycleState::Inactive(RetireReason::Unreachable);
                    FailureOutcome::Retired
                } else {
                    self.state = LifecycleState::Active { unreachable_count: count };
                    FailureOutcome::Counted(count)
                }
            }
        }
    }

    /// The server accepted our shutdown command.
    pub fn mark_shut_down(&mut self) {
        if !self.is_inactive() {
            self.state = LifecycleState::Inactive(RetireReason::ShutDown);
        }
    }
}

impl Default for ServerLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
