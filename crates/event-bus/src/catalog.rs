//! Immutable routing catalogs, built once before dispatch begins.
//!
//! Both catalogs are plain maps owned by the bus and never mutated after
//! [`BusBuilder::build`](crate::BusBuilder::build), so lookups need no locking.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::bus::EventBus;
use crate::handler::HandlerBinding;
use crate::saga::{ErasedSaga, ErasedSagaHook, SagaDescriptor};

/// Event type → handler bindings.
#[derive(Default)]
pub(crate) struct HandlerCatalog {
    by_event: HashMap<TypeId, Vec<HandlerBinding>>,
}

impl HandlerCatalog {
    /// Indexes bindings by event type, keeping registration order per event.
    pub(crate) fn new(bindings: Vec<HandlerBinding>) -> Self {
        let mut by_event: HashMap<TypeId, Vec<HandlerBinding>> = HashMap::new();
        for binding in bindings {
            by_event.entry(binding.event_type).or_default().push(binding);
        }
        Self { by_event }
    }

    /// Returns the handlers registered for an event type.
    pub(crate) fn handlers_for(&self, event_type: TypeId) -> &[HandlerBinding] {
        self.by_event
            .get(&event_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// A registered saga type and its hook tables.
pub(crate) struct SagaEntry {
    pub(crate) saga_type: TypeId,
    pub(crate) saga_name: &'static str,
    factory: Box<dyn Fn(&EventBus) -> Box<dyn ErasedSaga> + Send + Sync>,
    starts: HashMap<TypeId, Arc<dyn ErasedSagaHook>>,
    handles: HashMap<TypeId, Arc<dyn ErasedSagaHook>>,
}

impl SagaEntry {
    fn new(descriptor: SagaDescriptor) -> Self {
        Self {
            saga_type: descriptor.saga_type,
            saga_name: descriptor.saga_name,
            factory: descriptor.factory,
            starts: descriptor
                .starts
                .into_iter()
                .map(|hook| (hook.event_type, hook.invoker))
                .collect(),
            handles: descriptor
                .handles
                .into_iter()
                .map(|hook| (hook.event_type, hook.invoker))
                .collect(),
        }
    }

    /// Builds the saga singleton.
    pub(crate) fn resolve(&self, bus: &EventBus) -> Box<dyn ErasedSaga> {
        (self.factory)(bus)
    }

    /// Returns the start hook for an event type, if the saga declares one.
    pub(crate) fn start_hook(&self, event_type: TypeId) -> Option<&Arc<dyn ErasedSagaHook>> {
        self.starts.get(&event_type)
    }

    /// Returns the event hook for an event type, if the saga declares one.
    pub(crate) fn event_hook(&self, event_type: TypeId) -> Option<&Arc<dyn ErasedSagaHook>> {
        self.handles.get(&event_type)
    }
}

/// Saga type → (start-events, handled-events), plus the reverse indexes used
/// for routing.
#[derive(Default)]
pub(crate) struct SagaCatalog {
    entries: HashMap<TypeId, SagaEntry>,
    starters: HashMap<TypeId, Vec<TypeId>>,
    handled: HashSet<TypeId>,
}

impl SagaCatalog {
    /// Indexes saga descriptors. Start order follows registration order.
    pub(crate) fn new(descriptors: Vec<SagaDescriptor>) -> Self {
        let mut catalog = Self::default();

        for descriptor in descriptors {
            let entry = SagaEntry::new(descriptor);

            for event_type in entry.starts.keys() {
                let starters = catalog.starters.entry(*event_type).or_default();
                if !starters.contains(&entry.saga_type) {
                    starters.push(entry.saga_type);
                }
            }
            catalog.handled.extend(entry.handles.keys().copied());
            catalog.entries.insert(entry.saga_type, entry);
        }

        catalog
    }

    /// Returns the saga types started by an event type.
    pub(crate) fn starting(&self, event_type: TypeId) -> &[TypeId] {
        self.starters
            .get(&event_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns true if any saga declares the event type as a handled-event.
    pub(crate) fn is_handled(&self, event_type: TypeId) -> bool {
        self.handled.contains(&event_type)
    }

    /// Returns the entry for a saga type.
    pub(crate) fn entry(&self, saga_type: TypeId) -> Option<&SagaEntry> {
        self.entries.get(&saga_type)
    }

    /// Returns the number of registered saga types.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
