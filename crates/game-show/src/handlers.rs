//! Frame handlers.

use async_trait::async_trait;
use event_bus::{EventBus, EventHandler, Handler, HandlerContracts, HandlerResult};

use crate::events::{BuzzIn, PuzzleStarted, VideoFrameEvent};
use crate::sagas::Crosswords;

/// Turns each captured frame into game events.
///
/// Every frame announces a Crosswords puzzle and then a buzz-in, so the
/// Crosswords saga restarts on each frame.
pub struct CapturedFrameHandler {
    bus: EventBus,
}

impl CapturedFrameHandler {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl EventHandler<VideoFrameEvent> for CapturedFrameHandler {
    #[tracing::instrument(skip_all, fields(frame = event.frame().sequence))]
    async fn handle(&self, event: &VideoFrameEvent) -> HandlerResult {
        let frame = event.frame();
        tracing::info!(source = %frame.source, bytes = frame.data.len(), "frame captured");

        self.bus
            .publish(PuzzleStarted::<Crosswords>::new(frame.sequence))
            .await;
        self.bus.publish(BuzzIn).await;
        Ok(())
    }
}

impl Handler for CapturedFrameHandler {
    fn declare(contracts: &mut HandlerContracts<Self>) {
        contracts.handles::<VideoFrameEvent>();
    }
}
