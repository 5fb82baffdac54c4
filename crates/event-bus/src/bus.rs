//! Event dispatcher.

use std::any::{Any, TypeId};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;
use futures_util::future::join_all;
use tokio::task::JoinHandle;

use crate::builder::BusBuilder;
use crate::catalog::HandlerCatalog;
use crate::error::{DispatchError, panic_message};
use crate::event::{Event, PublishId, event_name};
use crate::orchestrator::SagaOrchestrator;

pub(crate) struct BusInner {
    pub(crate) handlers: HandlerCatalog,
    pub(crate) orchestrator: SagaOrchestrator,
}

/// The single entry point for publishing events.
///
/// Cloning is cheap; every clone dispatches through the same catalogs and the
/// same saga orchestrator.
///
/// A publish runs three stages in order:
/// 1. every handler registered for the event type, concurrently, each one
///    isolated from the others' failures
/// 2. the saga orchestrator: start routing, then handled-event routing
/// 3. [`Event::release`], exactly once, whatever happened before
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Returns a builder for registering handlers and sagas.
    pub fn builder() -> BusBuilder {
        BusBuilder::new()
    }

    pub(crate) fn from_inner(inner: Arc<BusInner>) -> Self {
        Self { inner }
    }

    /// Returns the saga orchestrator owned by this bus.
    pub fn orchestrator(&self) -> &SagaOrchestrator {
        &self.inner.orchestrator
    }

    /// Returns the number of handlers registered for `E`.
    pub fn handler_count<E: Event>(&self) -> usize {
        self.inner.handlers.handlers_for(TypeId::of::<E>()).len()
    }

    /// Returns the number of registered saga types.
    pub fn saga_count(&self) -> usize {
        self.inner.orchestrator.saga_count()
    }

    /// Publishes an event and waits until every stage has completed.
    ///
    /// Never fails: handler and saga faults are logged where they happen and
    /// the event's resource is released on every path.
    #[tracing::instrument(skip_all, fields(event = event_name::<E>(), publish_id = %PublishId::new()))]
    pub async fn publish<E: Event>(&self, mut event: E) {
        metrics::counter!("bus_events_published_total").increment(1);
        let publish_start = Instant::now();
        tracing::trace!("publishing event");

        if let Err(payload) = AssertUnwindSafe(self.dispatch(&event)).catch_unwind().await {
            let error = DispatchError::Publish {
                event: event_name::<E>(),
                message: panic_message(&*payload),
            };
            tracing::error!(%error, "error publishing event");
        }

        if let Err(payload) = AssertUnwindSafe(event.release()).catch_unwind().await {
            let error = DispatchError::Release {
                event: event_name::<E>(),
                message: panic_message(&*payload),
            };
            tracing::error!(%error, "error releasing event");
        }

        metrics::histogram!("bus_publish_duration_seconds")
            .record(publish_start.elapsed().as_secs_f64());
    }

    /// Publishes an event on a spawned task instead of awaiting it in place.
    ///
    /// This is the only detached form of publishing. Faults are reported the
    /// same way as for [`EventBus::publish`]; the handle only tells the caller
    /// when dispatch has finished. Saga hooks use this for follow-up events,
    /// since awaiting a publish from inside a saga hook would wait on the
    /// orchestrator that is running the hook.
    pub fn spawn_publish<E: Event>(&self, event: E) -> JoinHandle<()> {
        let bus = self.clone();
        tokio::spawn(async move { bus.publish(event).await })
    }

    async fn dispatch<E: Event>(&self, event: &E) {
        self.run_handlers(event).await;

        let orchestrator = &self.inner.orchestrator;
        orchestrator.start_saga(event).await;
        orchestrator.handle_event(event).await;
    }

    async fn run_handlers<E: Event>(&self, event: &E) {
        let bindings = self.inner.handlers.handlers_for(TypeId::of::<E>());
        if bindings.is_empty() {
            tracing::trace!("no handlers registered for event");
            return;
        }

        let erased: &(dyn Any + Send + Sync) = event;
        let invocations = bindings.iter().map(|binding| async move {
            metrics::counter!("bus_handler_invocations_total").increment(1);

            let outcome = AssertUnwindSafe(binding.invoker.invoke(self, erased))
                .catch_unwind()
                .await;
            let error = match outcome {
                Ok(Ok(())) => return,
                Ok(Err(source)) => DispatchError::Handler {
                    event: event_name::<E>(),
                    handler: binding.handler_name,
                    source,
                },
                Err(payload) => DispatchError::HandlerPanicked {
                    event: event_name::<E>(),
                    handler: binding.handler_name,
                    message: panic_message(&*payload),
                },
            };

            metrics::counter!("bus_handler_failures_total").increment(1);
            tracing::error!(%error, handler = binding.handler_name, "error handling event");
        });

        join_all(invocations).await;
    }
}
