//! Catalog builder.

use std::any::TypeId;
use std::collections::HashSet;
use std::sync::Arc;

use crate::bus::{BusInner, EventBus};
use crate::catalog::{HandlerCatalog, SagaCatalog};
use crate::handler::{HandlerBinding, HandlerDescriptor};
use crate::orchestrator::SagaOrchestrator;
use crate::saga::SagaDescriptor;

/// Accumulates handler and saga registrations, then commits them into an
/// [`EventBus`].
///
/// Registration has set semantics: the same `(event type, handler type)` pair or
/// the same saga type registered twice is kept once.
///
/// ```ignore
/// let bus = BusBuilder::new()
///     .register_handlers([HandlerDescriptor::of::<AuditHandler>()])
///     .register_sagas([SagaDescriptor::of::<QuizSaga>()])
///     .build();
/// ```
#[derive(Default)]
pub struct BusBuilder {
    bindings: Vec<HandlerBinding>,
    registered: HashSet<(TypeId, TypeId)>,
    handler_types: HashSet<TypeId>,
    sagas: Vec<SagaDescriptor>,
    saga_types: HashSet<TypeId>,
}

impl BusBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records every contract declared by each handler candidate.
    ///
    /// Candidates that declare no contract are ignored.
    pub fn register_handlers(
        mut self,
        candidates: impl IntoIterator<Item = HandlerDescriptor>,
    ) -> Self {
        for candidate in candidates {
            if candidate.bindings.is_empty() {
                tracing::debug!(
                    handler = candidate.handler_name,
                    "handler declares no event contract, skipping"
                );
                continue;
            }

            for binding in candidate.bindings {
                if self
                    .registered
                    .insert((binding.event_type, binding.handler_type))
                {
                    self.bindings.push(binding);
                }
            }
            self.handler_types.insert(candidate.handler_type);
        }
        self
    }

    /// Records each saga candidate.
    pub fn register_sagas(mut self, candidates: impl IntoIterator<Item = SagaDescriptor>) -> Self {
        for candidate in candidates {
            if self.saga_types.insert(candidate.saga_type) {
                self.sagas.push(candidate);
            }
        }
        self
    }

    /// Returns the number of distinct handler types registered so far.
    pub fn handler_count(&self) -> usize {
        self.handler_types.len()
    }

    /// Returns the number of distinct saga types registered so far.
    pub fn saga_count(&self) -> usize {
        self.sagas.len()
    }

    /// Commits both catalogs and returns the bus.
    ///
    /// Handlers are built per invocation; each saga is built once, the first
    /// time it is started, and lives as long as the bus.
    pub fn build(self) -> EventBus {
        tracing::debug!(
            handlers = self.handler_types.len(),
            bindings = self.bindings.len(),
            sagas = self.sagas.len(),
            "building event bus"
        );

        let handlers = HandlerCatalog::new(self.bindings);
        let sagas = SagaCatalog::new(self.sagas);

        let inner = Arc::new_cyclic(|bus| BusInner {
            handlers,
            orchestrator: SagaOrchestrator::new(sagas, bus.clone()),
        });
        EventBus::from_inner(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerResult;
    use crate::event::Event;
    use crate::handler::{EventHandler, Handler, HandlerContracts};
    use crate::saga::{Saga, SagaContracts};
    use async_trait::async_trait;

    struct Ping;
    impl Event for Ping {}

    struct Pong;
    impl Event for Pong {}

    #[derive(Default)]
    struct Echo;

    #[async_trait]
    impl EventHandler<Ping> for Echo {
        async fn handle(&self, _event: &Ping) -> HandlerResult {
            Ok(())
        }
    }

    #[async_trait]
    impl EventHandler<Pong> for Echo {
        async fn handle(&self, _event: &Pong) -> HandlerResult {
            Ok(())
        }
    }

    impl Handler for Echo {
        fn declare(contracts: &mut HandlerContracts<Self>) {
            contracts.handles::<Ping>().handles::<Pong>();
        }
    }

    #[derive(Default)]
    struct Mute;

    impl Handler for Mute {
        fn declare(_contracts: &mut HandlerContracts<Self>) {}
    }

    #[derive(Default)]
    struct Idle;

    impl Saga for Idle {
        fn is_active(&self) -> bool {
            false
        }

        fn reset(&mut self) {}

        fn declare(_contracts: &mut SagaContracts<Self>) {}
    }

    #[test]
    fn test_empty_builder() {
        let builder = BusBuilder::new();
        assert_eq!(builder.handler_count(), 0);
        assert_eq!(builder.saga_count(), 0);

        let bus = builder.build();
        assert_eq!(bus.handler_count::<Ping>(), 0);
        assert_eq!(bus.saga_count(), 0);
    }

    #[test]
    fn test_duplicate_handler_registration_is_idempotent() {
        let builder = BusBuilder::new()
            .register_handlers([HandlerDescriptor::of::<Echo>()])
            .register_handlers([
                HandlerDescriptor::of::<Echo>(),
                HandlerDescriptor::of::<Echo>(),
            ]);
        assert_eq!(builder.handler_count(), 1);
        assert_eq!(builder.bindings.len(), 2);

        let bus = builder.build();
        assert_eq!(bus.handler_count::<Ping>(), 1);
        assert_eq!(bus.handler_count::<Pong>(), 1);
    }

    #[test]
    fn test_handler_without_contracts_is_skipped() {
        let builder = BusBuilder::new().register_handlers([HandlerDescriptor::of::<Mute>()]);
        assert_eq!(builder.handler_count(), 0);
    }

    #[test]
    fn test_sagas_register_once_and_unconditionally() {
        let builder = BusBuilder::new()
            .register_sagas([SagaDescriptor::of::<Idle>()])
            .register_sagas([SagaDescriptor::of::<Idle>()]);
        assert_eq!(builder.saga_count(), 1);
        assert_eq!(builder.build().saga_count(), 1);
    }
}
