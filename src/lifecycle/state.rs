//! Lifecycle states and the single-step events that move a host between them.

/// Discrete lifecycle state of a host component.
///
/// States are totally ordered: `Destroyed < Initialized < Created < Started < Resumed`.
/// `Destroyed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    Destroyed,
    Initialized,
    Created,
    Started,
    Resumed,
}

impl LifecycleState {
    /// Returns `true` if this state is greater than or equal to `other`.
    pub fn is_at_least(self, other: LifecycleState) -> bool {
        self >= other
    }
}

/// Transition notification emitted by a [`Lifecycle`](super::Lifecycle).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    Create,
    Start,
    Resume,
    Pause,
    Stop,
    Destroy,
}

impl LifecycleEvent {
    /// State the host is in once this event has been dispatched.
    pub fn target_state(self) -> LifecycleState {
        match self {
            LifecycleEvent::Create | LifecycleEvent::Stop => LifecycleState::Created,
            LifecycleEvent::Start | LifecycleEvent::Pause => LifecycleState::Started,
            LifecycleEvent::Resume => LifecycleState::Resumed,
            LifecycleEvent::Destroy => LifecycleState::Destroyed,
        }
    }

    /// Whether the event moves the host towards `Resumed`.
    pub fn is_upward(self) -> bool {
        matches!(
            self,
            LifecycleEvent::Create | LifecycleEvent::Start | LifecycleEvent::Resume
        )
    }

    /// The event that moves a host from `state` one step up, if any.
    pub fn up_from(state: LifecycleState) -> Option<LifecycleEvent> {
        match state {
            LifecycleState::Initialized => Some(LifecycleEvent::Create),
            LifecycleState::Created => Some(LifecycleEvent::Start),
            LifecycleState::Started => Some(LifecycleEvent::Resume),
            LifecycleState::Resumed | LifecycleState::Destroyed => None,
        }
    }

    /// The event that moves a host from `state` one step down, if any.
    pub fn down_from(state: LifecycleState) -> Option<LifecycleEvent> {
        match state {
            LifecycleState::Created => Some(LifecycleEvent::Destroy),
            LifecycleState::Started => Some(LifecycleEvent::Stop),
            LifecycleState::Resumed => Some(LifecycleEvent::Pause),
            LifecycleState::Initialized | LifecycleState::Destroyed => None,
        }
    }

    /// Returns `true` if the event is a legal single step from `state`.
    pub fn is_legal_from(self, state: LifecycleState) -> bool {
        LifecycleEvent::up_from(state) == Some(self) || LifecycleEvent::down_from(state) == Some(self)
    }
}
