//! Game-show host: video frames in, puzzle rounds out.
//!
//! A [`FrameFeed`](feed::FrameFeed) publishes one `VideoFrameEvent` per tick.
//! The [`CapturedFrameHandler`](handlers::CapturedFrameHandler) turns each frame
//! into `PuzzleStarted<Crosswords>` followed by `BuzzIn`, which drive the
//! [`CrosswordsSaga`](sagas::CrosswordsSaga) through its round.

pub mod config;
pub mod error;
pub mod events;
pub mod feed;
pub mod handlers;
pub mod sagas;

use event_bus::{BusBuilder, EventBus, HandlerDescriptor, SagaDescriptor};

use crate::handlers::CapturedFrameHandler;
use crate::sagas::CrosswordsSaga;

/// Registers every handler and saga of the show and builds the bus.
pub fn build_bus() -> EventBus {
    let builder = BusBuilder::new()
        .register_handlers([HandlerDescriptor::new(|bus: &EventBus| {
            CapturedFrameHandler::new(bus.clone())
        })])
        .register_sagas([SagaDescriptor::of::<CrosswordsSaga>()]);

    tracing::info!(
        handlers = builder.handler_count(),
        sagas = builder.saga_count(),
        "event bus registered"
    );
    builder.build()
}
