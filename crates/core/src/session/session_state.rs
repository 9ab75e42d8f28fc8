use std::fmt;

/// Lifecycle of a detection session.
///
/// `Starting` and `Stopping` are only observed through
/// [`SessionEvent::StateChanged`](crate::session::session_event::SessionEvent)
/// while a transition is underway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl SessionState {
    pub fn is_running(self) -> bool {
        self == SessionState::Running
    }

    /// Text for the start/stop control.
    pub fn toggle_label(self) -> &'static str {
        match self {
            SessionState::Stopped | SessionState::Stopping => "Start Video",
            SessionState::Starting | SessionState::Running => "Stop Video",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Stopped => "stopped",
            SessionState::Starting => "starting",
            SessionState::Running => "running",
            SessionState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}
