use crate::detection::domain::expression_aggregator::DominantExpression;
use crate::scheduler::detection_scheduler::SkipReason;
use crate::session::session_state::SessionState;

/// Notifications pushed to the UI layer while a session runs.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged(SessionState),
    /// The dominant expression changed; `None` after a reset.
    ExpressionChanged(Option<DominantExpression>),
    /// A pass was applied to the render target.
    PassRendered { faces: usize },
    TickSkipped(SkipReason),
    /// Inference failed; the next tick retries.
    TickFailed(String),
}
