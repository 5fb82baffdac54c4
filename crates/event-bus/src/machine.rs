//! Saga state machine base.

/// Lifecycle core shared by sagas: the active flag and a state payload that
/// is replaced wholesale on every start.
///
/// State transitions:
/// ```text
/// inactive ──begin()──► active ──reset()──► inactive
///             ▲                                │
///             └──────── begin() (fresh state) ◄┘
/// ```
///
/// `reset` leaves the payload untouched; the next `begin` overwrites it.
#[derive(Debug, Clone, Default)]
pub struct SagaCore<S> {
    state: S,
    active: bool,
}

impl<S: Default> SagaCore<S> {
    /// Creates an inactive core holding the default state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a round: replaces the state with a fresh default and activates.
    ///
    /// Returns the new state so the caller can initialize it from the start event.
    pub fn begin(&mut self) -> &mut S {
        self.state = S::default();
        self.active = true;
        &mut self.state
    }

    /// Deactivates. Calling it on an inactive core has no effect.
    pub fn reset(&mut self) {
        self.active = false;
    }

    /// Returns true while the round is running.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns the current state.
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Returns the current state for mutation.
    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }
}
