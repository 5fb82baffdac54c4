//! Dispatch error types.

use std::any::Any;

use thiserror::Error;

/// Boxed error returned by handler and saga hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result returned by every collaborator hook.
pub type HandlerResult = std::result::Result<(), BoxError>;

/// Faults raised while dispatching an event.
///
/// None of these escape [`EventBus::publish`](crate::EventBus::publish): each one
/// is terminal at the point where it happens and is reported through `tracing`.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A handler hook returned an error.
    #[error("Handler {handler} failed on {event}: {source}")]
    Handler {
        event: &'static str,
        handler: &'static str,
        source: BoxError,
    },

    /// A handler hook panicked.
    #[error("Handler {handler} panicked on {event}: {message}")]
    HandlerPanicked {
        event: &'static str,
        handler: &'static str,
        message: String,
    },

    /// A saga start hook returned an error, aborting the rest of the start.
    #[error("Saga {saga} failed to start on {event}: {source}")]
    SagaStart {
        event: &'static str,
        saga: &'static str,
        source: BoxError,
    },

    /// An active saga's event hook returned an error.
    #[error("Saga {saga} failed handling {event}: {source}")]
    SagaEvent {
        event: &'static str,
        saga: &'static str,
        source: BoxError,
    },

    /// A saga hook panicked.
    #[error("Saga stage '{stage}' panicked on {event}: {message}")]
    SagaPanicked {
        event: &'static str,
        stage: &'static str,
        message: String,
    },

    /// A routed call reached a target that does not implement the contract.
    #[error("{subject} does not implement the contract for {event}")]
    ContractMismatch {
        subject: &'static str,
        event: &'static str,
    },

    /// A saga singleton could not be resolved because the bus is gone.
    #[error("Saga {saga} could not be resolved: the bus has been dropped")]
    SagaUnavailable { saga: &'static str },

    /// Releasing the event's owned resource panicked.
    #[error("Releasing {event} panicked: {message}")]
    Release {
        event: &'static str,
        message: String,
    },

    /// The dispatch pipeline itself panicked outside any guarded hook.
    #[error("Publishing {event} panicked: {message}")]
    Publish {
        event: &'static str,
        message: String,
    },
}

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
