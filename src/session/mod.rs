//! Session state: the in-flight guard and the desktop session model

pub mod desktop;
pub mod guard;

pub use desktop::{apply, DesktopSession, DesktopState, SessionMessage, TriggerOutcome};
pub use guard::{SessionGuard, SessionState};
