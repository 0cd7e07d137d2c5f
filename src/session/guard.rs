//! At-most-one in-flight analysis per session

/// Whether an analysis is in flight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing running; a trigger may start an analysis
    #[default]
    Idle,
    /// An analysis is in flight; triggers are ignored
    Running,
}

/// Two-state machine guarding a session
///
/// `try_start` is the only Idle to Running transition and `finish` the only
/// Running to Idle transition. The owner must call `finish` on every exit
/// path of the delivery call.
#[derive(Debug, Clone, Default)]
pub struct SessionGuard {
    state: SessionState,
}

impl SessionGuard {
    /// A guard in the Idle state
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True while an analysis is in flight
    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    /// Move to Running; returns false (and changes nothing) if already Running
    pub fn try_start(&mut self) -> bool {
        match self.state {
            SessionState::Idle => {
                self.state = SessionState::Running;
                true
            }
            SessionState::Running => false,
        }
    }

    /// Return to Idle
    pub fn finish(&mut self) {
        self.state = SessionState::Idle;
    }
}
