//! Saga contracts and their type-erased hook entries.

use std::any::{Any, TypeId, type_name};
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::bus::EventBus;
use crate::error::{DispatchError, HandlerResult};
use crate::event::Event;

/// A long-lived, stateful reactor.
///
/// There is exactly one instance per saga type for the life of the bus. A
/// start-event activates it; it then receives the events it declares with
/// [`SagaContracts::handles`] until the next round resets it.
pub trait Saga: Send + Sync + Sized + 'static {
    /// Returns true while the saga takes part in the current round.
    fn is_active(&self) -> bool;

    /// Deactivates the saga. Must be idempotent.
    fn reset(&mut self);

    /// Declares the start-events and handled-events of this saga.
    fn declare(contracts: &mut SagaContracts<Self>);
}

/// Start contract: `E` (re)starts the saga.
#[async_trait]
pub trait SagaStartedBy<E: Event>: Saga {
    /// Starts a new round for this saga.
    async fn handle_start(&mut self, event: &E) -> HandlerResult;
}

/// Event contract: the saga reacts to `E` while active.
#[async_trait]
pub trait SagaHandles<E: Event>: Saga {
    /// Handles an event routed to the active saga.
    async fn handle(&mut self, event: &E) -> HandlerResult;
}

/// Collects the contracts a [`Saga`] declares.
pub struct SagaContracts<S> {
    starts: Vec<SagaHook>,
    handles: Vec<SagaHook>,
    _saga: PhantomData<fn() -> S>,
}

impl<S: Saga> SagaContracts<S> {
    fn new() -> Self {
        Self {
            starts: Vec::new(),
            handles: Vec::new(),
            _saga: PhantomData,
        }
    }

    /// Declares that `E` starts this saga.
    pub fn started_by<E: Event>(&mut self) -> &mut Self
    where
        S: SagaStartedBy<E>,
    {
        self.starts.push(SagaHook {
            event_type: TypeId::of::<E>(),
            invoker: Arc::new(StartHook::<S, E>(PhantomData)),
        });
        self
    }

    /// Declares that this saga handles `E` while active.
    pub fn handles<E: Event>(&mut self) -> &mut Self
    where
        S: SagaHandles<E>,
    {
        self.handles.push(SagaHook {
            event_type: TypeId::of::<E>(),
            invoker: Arc::new(EventHook::<S, E>(PhantomData)),
        });
        self
    }
}

type SagaFactory = Box<dyn Fn(&EventBus) -> Box<dyn ErasedSaga> + Send + Sync>;

/// A saga candidate: its type identity, singleton factory and declared contracts.
pub struct SagaDescriptor {
    pub(crate) saga_type: TypeId,
    pub(crate) saga_name: &'static str,
    pub(crate) factory: SagaFactory,
    pub(crate) starts: Vec<SagaHook>,
    pub(crate) handles: Vec<SagaHook>,
}

impl SagaDescriptor {
    /// Describes saga `S`. `factory` runs once, the first time `S` is started.
    pub fn new<S, F>(factory: F) -> Self
    where
        S: Saga,
        F: Fn(&EventBus) -> S + Send + Sync + 'static,
    {
        let mut contracts = SagaContracts::<S>::new();
        S::declare(&mut contracts);

        Self {
            saga_type: TypeId::of::<S>(),
            saga_name: type_name::<S>(),
            factory: Box::new(move |bus: &EventBus| -> Box<dyn ErasedSaga> {
                Box::new(factory(bus))
            }),
            starts: contracts.starts,
            handles: contracts.handles,
        }
    }

    /// Describes a saga that is built with `Default`.
    pub fn of<S: Saga + Default>() -> Self {
        Self::new(|_: &EventBus| S::default())
    }

    /// Returns the saga's type name.
    pub fn saga_name(&self) -> &'static str {
        self.saga_name
    }
}

/// A declared saga hook keyed by the event type that triggers it.
pub(crate) struct SagaHook {
    pub(crate) event_type: TypeId,
    pub(crate) invoker: Arc<dyn ErasedSagaHook>,
}

/// Object-safe view of a saga singleton, as stored in the orchestrator's arena.
pub(crate) trait ErasedSaga: Send + Sync {
    fn is_active(&self) -> bool;
    fn reset(&mut self);
    fn as_any(&self) -> &(dyn Any + Send + Sync);
    fn as_any_mut(&mut self) -> &mut (dyn Any + Send + Sync);
}

impl<S: Saga> ErasedSaga for S {
    fn is_active(&self) -> bool {
        Saga::is_active(self)
    }

    fn reset(&mut self) {
        Saga::reset(self)
    }

    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }

    fn as_any_mut(&mut self) -> &mut (dyn Any + Send + Sync) {
        self
    }
}

/// A strongly typed saga hook behind a type-erased signature.
#[async_trait]
pub(crate) trait ErasedSagaHook: Send + Sync {
    async fn invoke(
        &self,
        saga: &mut dyn ErasedSaga,
        event: &(dyn Any + Send + Sync),
    ) -> HandlerResult;
}

struct StartHook<S, E>(PhantomData<fn(&mut S, &E)>);

struct EventHook<S, E>(PhantomData<fn(&mut S, &E)>);

fn downcast_pair<'a, S: Saga, E: Event>(
    saga: &'a mut dyn ErasedSaga,
    event: &'a (dyn Any + Send + Sync),
) -> Result<(&'a mut S, &'a E), DispatchError> {
    let mismatch = || DispatchError::ContractMismatch {
        subject: type_name::<S>(),
        event: type_name::<E>(),
    };
    let saga = saga.as_any_mut().downcast_mut::<S>().ok_or_else(mismatch)?;
    let event = event.downcast_ref::<E>().ok_or_else(mismatch)?;
    Ok((saga, event))
}

#[async_trait]
impl<S, E> ErasedSagaHook for StartHook<S, E>
where
    S: SagaStartedBy<E>,
    E: Event,
{
    async fn invoke(
        &self,
        saga: &mut dyn ErasedSaga,
        event: &(dyn Any + Send + Sync),
    ) -> HandlerResult {
        let (saga, event) = downcast_pair::<S, E>(saga, event)?;
        saga.handle_start(event).await
    }
}

#[async_trait]
impl<S, E> ErasedSagaHook for EventHook<S, E>
where
    S: SagaHandles<E>,
    E: Event,
{
    async fn invoke(
        &self,
        saga: &mut dyn ErasedSaga,
        event: &(dyn Any + Send + Sync),
    ) -> HandlerResult {
        let (saga, event) = downcast_pair::<S, E>(saga, event)?;
        saga.handle(event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Begin;
    impl Event for Begin {}

    struct Tick;
    impl Event for Tick {}

    #[derive(Default)]
    struct Counter {
        active: bool,
        ticks: u32,
    }

    impl Saga for Counter {
        fn is_active(&self) -> bool {
            self.active
        }

        fn reset(&mut self) {
            self.active = false;
        }

        fn declare(contracts: &mut SagaContracts<Self>) {
            contracts.started_by::<Begin>().handles::<Tick>();
        }
    }

    #[async_trait]
    impl SagaStartedBy<Begin> for Counter {
        async fn handle_start(&mut self, _event: &Begin) -> HandlerResult {
            self.ticks = 0;
            self.active = true;
            Ok(())
        }
    }

    #[async_trait]
    impl SagaHandles<Tick> for Counter {
        async fn handle(&mut self, _event: &Tick) -> HandlerResult {
            self.ticks += 1;
            Ok(())
        }
    }

    #[test]
    fn test_descriptor_splits_start_and_handled_contracts() {
        let descriptor = SagaDescriptor::of::<Counter>();

        assert_eq!(descriptor.saga_type, TypeId::of::<Counter>());
        assert!(descriptor.saga_name().ends_with("Counter"));
        assert_eq!(descriptor.starts.len(), 1);
        assert_eq!(descriptor.starts[0].event_type, TypeId::of::<Begin>());
        assert_eq!(descriptor.handles.len(), 1);
        assert_eq!(descriptor.handles[0].event_type, TypeId::of::<Tick>());
    }

    #[tokio::test]
    async fn test_hooks_drive_the_typed_saga() {
        let bus = EventBus::builder().build();
        let descriptor = SagaDescriptor::of::<Counter>();
        let mut saga = (descriptor.factory)(&bus);

        descriptor.starts[0]
            .invoker
            .invoke(saga.as_mut(), &Begin)
            .await
            .unwrap();
        descriptor.handles[0]
            .invoker
            .invoke(saga.as_mut(), &Tick)
            .await
            .unwrap();

        assert!(saga.is_active());
        let counter = saga.as_any().downcast_ref::<Counter>().unwrap();
        assert_eq!(counter.ticks, 1);

        saga.reset();
        saga.reset();
        assert!(!saga.is_active());
    }

    #[tokio::test]
    async fn test_hook_rejects_wrong_event_type() {
        let bus = EventBus::builder().build();
        let descriptor = SagaDescriptor::of::<Counter>();
        let mut saga = (descriptor.factory)(&bus);

        let result = descriptor.handles[0]
            .invoker
            .invoke(saga.as_mut(), &Begin)
            .await;

        assert!(result.is_err());
        assert!(!saga.is_active());
    }
}
