//! Saga orchestrator.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::panic::AssertUnwindSafe;
use std::sync::Weak;

use futures_util::FutureExt;
use tokio::sync::Mutex;

use crate::bus::{BusInner, EventBus};
use crate::catalog::SagaCatalog;
use crate::error::{DispatchError, panic_message};
use crate::event::{Event, event_name};
use crate::saga::{ErasedSaga, Saga};

/// The saga singletons resolved so far and the ones taking part in the
/// current round.
#[derive(Default)]
struct RoundState {
    instances: HashMap<TypeId, Box<dyn ErasedSaga>>,
    active: Vec<TypeId>,
}

impl RoundState {
    fn reset_active(&mut self) {
        for saga_type in self.active.drain(..) {
            if let Some(saga) = self.instances.get_mut(&saga_type) {
                saga.reset();
            }
        }
    }
}

/// Owns the active saga set and routes events to it.
///
/// At most one round runs at a time: any start-event resets every active saga,
/// related or not, before activating the sagas it starts. The reset and the
/// activation happen under one lock, which is also taken for routing, so no
/// caller ever sees a half-replaced round.
pub struct SagaOrchestrator {
    catalog: SagaCatalog,
    round: Mutex<RoundState>,
    bus: Weak<BusInner>,
}

impl SagaOrchestrator {
    pub(crate) fn new(catalog: SagaCatalog, bus: Weak<BusInner>) -> Self {
        Self {
            catalog,
            round: Mutex::new(RoundState::default()),
            bus,
        }
    }

    pub(crate) fn saga_count(&self) -> usize {
        self.catalog.len()
    }

    /// Starts a new round if `E` is a start-event for any saga.
    ///
    /// A failing or panicking start hook aborts the rest of the transaction and
    /// leaves its saga reset; sagas started before it stay active. Nothing is
    /// propagated to the caller.
    #[tracing::instrument(skip_all, fields(event = event_name::<E>()))]
    pub async fn start_saga<E: Event>(&self, event: &E) {
        let starting = self.catalog.starting(TypeId::of::<E>());
        if starting.is_empty() {
            return;
        }

        let mut round = self.round.lock().await;
        let outcome = AssertUnwindSafe(self.start_round(&mut round, starting, event))
            .catch_unwind()
            .await;
        let error = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(error)) => error,
            Err(payload) => DispatchError::SagaPanicked {
                event: event_name::<E>(),
                stage: "start",
                message: panic_message(&*payload),
            },
        };

        metrics::counter!("bus_saga_failures_total").increment(1);
        tracing::error!(%error, "error starting saga");
    }

    async fn start_round<E: Event>(
        &self,
        round: &mut RoundState,
        starting: &[TypeId],
        event: &E,
    ) -> Result<(), DispatchError> {
        let event_type = TypeId::of::<E>();
        let erased: &(dyn Any + Send + Sync) = event;

        round.reset_active();

        for saga_type in starting {
            let Some(entry) = self.catalog.entry(*saga_type) else {
                continue;
            };
            let Some(hook) = entry.start_hook(event_type) else {
                tracing::warn!(
                    saga = entry.saga_name,
                    "saga does not implement the start contract for this event"
                );
                continue;
            };

            let saga = match round.instances.entry(*saga_type) {
                Entry::Occupied(slot) => slot.into_mut(),
                Entry::Vacant(slot) => {
                    let bus = self.resolve_bus(entry.saga_name)?;
                    tracing::debug!(saga = entry.saga_name, "resolving saga singleton");
                    slot.insert(entry.resolve(&bus))
                }
            };

            let outcome = AssertUnwindSafe(hook.invoke(saga.as_mut(), erased))
                .catch_unwind()
                .await;
            let error = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(source)) => Some(DispatchError::SagaStart {
                    event: event_name::<E>(),
                    saga: entry.saga_name,
                    source,
                }),
                Err(payload) => Some(DispatchError::SagaPanicked {
                    event: event_name::<E>(),
                    stage: "start",
                    message: panic_message(&*payload),
                }),
            };
            if let Some(error) = error {
                // Never joins the active set, so no later round would reset it.
                saga.reset();
                return Err(error);
            }

            round.active.push(entry.saga_type);
            metrics::counter!("bus_saga_starts_total").increment(1);
            tracing::debug!(saga = entry.saga_name, "saga started");
        }

        Ok(())
    }

    /// Routes `E` to every active saga that declares it.
    ///
    /// An active saga without the contract is skipped with a warning; a saga
    /// that deactivated itself is skipped silently. Each saga's failure is
    /// logged and does not affect the others.
    #[tracing::instrument(skip_all, fields(event = event_name::<E>()))]
    pub async fn handle_event<E: Event>(&self, event: &E) {
        let event_type = TypeId::of::<E>();
        if !self.catalog.is_handled(event_type) {
            return;
        }

        let erased: &(dyn Any + Send + Sync) = event;
        let mut round = self.round.lock().await;
        let RoundState { instances, active } = &mut *round;

        for saga_type in active.iter() {
            let (Some(entry), Some(saga)) =
                (self.catalog.entry(*saga_type), instances.get_mut(saga_type))
            else {
                continue;
            };

            if !saga.is_active() {
                tracing::debug!(saga = entry.saga_name, "saga is inactive, skipping");
                continue;
            }

            let Some(hook) = entry.event_hook(event_type) else {
                tracing::warn!(saga = entry.saga_name, "saga does not handle event");
                continue;
            };

            metrics::counter!("bus_saga_events_total").increment(1);
            let outcome = AssertUnwindSafe(hook.invoke(saga.as_mut(), erased))
                .catch_unwind()
                .await;
            let error = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(source)) => DispatchError::SagaEvent {
                    event: event_name::<E>(),
                    saga: entry.saga_name,
                    source,
                },
                Err(payload) => DispatchError::SagaPanicked {
                    event: event_name::<E>(),
                    stage: "event",
                    message: panic_message(&*payload),
                },
            };

            metrics::counter!("bus_saga_failures_total").increment(1);
            tracing::error!(%error, saga = entry.saga_name, "error handling event for saga");
        }
    }

    /// Resets every active saga and empties the active set.
    pub async fn reset_all(&self) {
        let mut round = self.round.lock().await;
        round.reset_active();
        tracing::debug!("active sagas reset");
    }

    /// Returns the type names of the active sagas, in activation order.
    pub async fn active_sagas(&self) -> Vec<&'static str> {
        let round = self.round.lock().await;
        round
            .active
            .iter()
            .filter_map(|saga_type| self.catalog.entry(*saga_type))
            .map(|entry| entry.saga_name)
            .collect()
    }

    /// Reads the singleton of saga `S` under the orchestrator lock.
    ///
    /// Returns `None` until `S` has been started for the first time.
    pub async fn inspect<S: Saga, R>(&self, f: impl FnOnce(&S) -> R) -> Option<R> {
        let round = self.round.lock().await;
        round
            .instances
            .get(&TypeId::of::<S>())
            .and_then(|saga| saga.as_any().downcast_ref::<S>())
            .map(f)
    }

    fn resolve_bus(&self, saga: &'static str) -> Result<EventBus, DispatchError> {
        self.bus
            .upgrade()
            .map(EventBus::from_inner)
            .ok_or(DispatchError::SagaUnavailable { saga })
    }
}
