//! In-process event dispatcher with single-round saga orchestration.
//!
//! Producers publish typed events through an [`EventBus`]. Each publish fans out
//! to every [`EventHandler`] registered for the event type, then hands the event
//! to the [`SagaOrchestrator`]:
//!
//! ```text
//! publish(event)
//!     │
//!     ├─► handlers (concurrent, failures isolated and logged)
//!     │
//!     ├─► SagaOrchestrator::start_saga   ── start-event? reset round, activate sagas
//!     ├─► SagaOrchestrator::handle_event ── route to active sagas that declare it
//!     │
//!     └─► Event::release (exactly once)
//! ```
//!
//! Handlers and sagas are registered once through [`BusBuilder`], using
//! [`HandlerDescriptor`] and [`SagaDescriptor`] in place of runtime type
//! scanning. Each declared contract becomes an entry in a type-erased dispatch
//! table keyed by `TypeId`, so routing is a map lookup and one indirect call.

pub mod builder;
pub mod bus;
mod catalog;
pub mod error;
pub mod event;
pub mod handler;
pub mod machine;
pub mod orchestrator;
pub mod saga;

pub use builder::BusBuilder;
pub use bus::EventBus;
pub use error::{BoxError, DispatchError, HandlerResult};
pub use event::{Event, PublishId, event_name};
pub use handler::{EventHandler, Handler, HandlerContracts, HandlerDescriptor};
pub use machine::SagaCore;
pub use orchestrator::SagaOrchestrator;
pub use saga::{Saga, SagaContracts, SagaDescriptor, SagaHandles, SagaStartedBy};
