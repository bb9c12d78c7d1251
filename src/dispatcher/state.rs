use crate::queue::Completion;

/// Coarse dispatcher mode, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    AwaitingReply,
    Closed,
}

/// Owned exclusively by the dispatcher task. The in-flight completion only
/// exists inside `AwaitingReply`, so "at most one in flight" holds by
/// construction.
#[derive(Debug, Default)]
pub(crate) enum DispatcherState {
    #[default]
    Idle,
    AwaitingReply {
        command: String,
        completion: Completion,
    },
    Closed,
}

impl DispatcherState {
    pub(crate) fn mode(&self) -> Mode {
        match self {
            Self::Idle => Mode::Idle,
            Self::AwaitingReply { .. } => Mode::AwaitingReply,
            Self::Closed => Mode::Closed,
        }
    }
}
