//! Handler contracts and their type-erased dispatch entries.

use std::any::{Any, TypeId, type_name};
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::bus::EventBus;
use crate::error::{DispatchError, HandlerResult};
use crate::event::Event;

/// Reacts to one event type.
///
/// A handler instance is created fresh for every invocation, so nothing stored
/// on `self` survives from one event to the next.
#[async_trait]
pub trait EventHandler<E: Event>: Send + Sync {
    /// Handles a published event.
    async fn handle(&self, event: &E) -> HandlerResult;
}

/// A handler type that can be registered on the bus.
///
/// `declare` lists every [`EventHandler`] contract the type implements. This is
/// the explicit stand-in for discovering contracts by inspecting the type.
pub trait Handler: Send + Sync + Sized + 'static {
    /// Declares the event contracts this handler implements.
    fn declare(contracts: &mut HandlerContracts<Self>);
}

type HandlerFactory<H> = Arc<dyn Fn(&EventBus) -> H + Send + Sync>;

/// Collects the contracts a [`Handler`] declares.
pub struct HandlerContracts<H> {
    factory: HandlerFactory<H>,
    bindings: Vec<HandlerBinding>,
}

impl<H: Handler> HandlerContracts<H> {
    /// Declares that `H` handles events of type `E`.
    pub fn handles<E: Event>(&mut self) -> &mut Self
    where
        H: EventHandler<E>,
    {
        self.bindings.push(HandlerBinding {
            event_type: TypeId::of::<E>(),
            handler_type: TypeId::of::<H>(),
            handler_name: type_name::<H>(),
            invoker: Arc::new(TypedHandler::<E, H> {
                factory: Arc::clone(&self.factory),
                _event: PhantomData,
            }),
        });
        self
    }
}

/// A handler candidate: its type identity, factory and declared contracts.
pub struct HandlerDescriptor {
    pub(crate) handler_type: TypeId,
    pub(crate) handler_name: &'static str,
    pub(crate) bindings: Vec<HandlerBinding>,
}

impl HandlerDescriptor {
    /// Describes handler `H`, built by `factory` on every invocation.
    pub fn new<H, F>(factory: F) -> Self
    where
        H: Handler,
        F: Fn(&EventBus) -> H + Send + Sync + 'static,
    {
        let mut contracts = HandlerContracts {
            factory: Arc::new(factory),
            bindings: Vec::new(),
        };
        H::declare(&mut contracts);

        Self {
            handler_type: TypeId::of::<H>(),
            handler_name: type_name::<H>(),
            bindings: contracts.bindings,
        }
    }

    /// Describes a handler that is built with `Default`.
    pub fn of<H: Handler + Default>() -> Self {
        Self::new(|_: &EventBus| H::default())
    }

    /// Returns the handler's type name.
    pub fn handler_name(&self) -> &'static str {
        self.handler_name
    }

    /// Returns the number of event contracts the handler declared.
    pub fn contract_count(&self) -> usize {
        self.bindings.len()
    }
}

/// One `(event type, handler type)` entry of the dispatch table.
pub(crate) struct HandlerBinding {
    pub(crate) event_type: TypeId,
    pub(crate) handler_type: TypeId,
    pub(crate) handler_name: &'static str,
    pub(crate) invoker: Arc<dyn ErasedHandler>,
}

/// A strongly typed handler call behind a type-erased signature.
#[async_trait]
pub(crate) trait ErasedHandler: Send + Sync {
    async fn invoke(&self, bus: &EventBus, event: &(dyn Any + Send + Sync)) -> HandlerResult;
}

struct TypedHandler<E, H> {
    factory: HandlerFactory<H>,
    _event: PhantomData<fn(&E)>,
}

#[async_trait]
impl<E, H> ErasedHandler for TypedHandler<E, H>
where
    E: Event,
    H: EventHandler<E> + 'static,
{
    async fn invoke(&self, bus: &EventBus, event: &(dyn Any + Send + Sync)) -> HandlerResult {
        let event = event
            .downcast_ref::<E>()
            .ok_or(DispatchError::ContractMismatch {
                subject: type_name::<H>(),
                event: type_name::<E>(),
            })?;

        let handler = (self.factory)(bus);
        handler.handle(event).await
    }
}
