//! Frame and puzzle events.

use std::fmt;
use std::marker::PhantomData;

use async_trait::async_trait;
use event_bus::Event;

/// One captured video frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub sequence: u64,
    pub source: String,
    pub data: Vec<u8>,
}

/// A captured frame travelling through the bus.
///
/// Owns the frame buffer; the buffer is freed by [`Event::release`] once every
/// handler and saga has seen the event.
#[derive(Debug)]
pub struct VideoFrameEvent {
    frame: Frame,
    released: bool,
}

impl VideoFrameEvent {
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            released: false,
        }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Returns true once the buffer has been freed.
    pub fn is_released(&self) -> bool {
        self.released
    }
}

#[async_trait]
impl Event for VideoFrameEvent {
    async fn release(&mut self) {
        let bytes = std::mem::take(&mut self.frame.data).len();
        self.released = true;
        tracing::trace!(frame = self.frame.sequence, bytes, "frame buffer released");
    }
}

/// A puzzle has appeared on screen.
///
/// `P` only selects which game saga the event starts.
pub struct PuzzleStarted<P> {
    frame: u64,
    _puzzle: PhantomData<fn() -> P>,
}

impl<P> PuzzleStarted<P> {
    /// Creates the event for the frame the puzzle was detected on.
    pub fn new(frame: u64) -> Self {
        Self {
            frame,
            _puzzle: PhantomData,
        }
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}

impl<P> fmt::Debug for PuzzleStarted<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PuzzleStarted")
            .field("puzzle", &std::any::type_name::<P>())
            .field("frame", &self.frame)
            .finish()
    }
}

impl<P: 'static> Event for PuzzleStarted<P> {}

/// The puzzle has left the screen.
pub struct PuzzleFinished<P> {
    _puzzle: PhantomData<fn() -> P>,
}

impl<P> PuzzleFinished<P> {
    pub fn new() -> Self {
        Self {
            _puzzle: PhantomData,
        }
    }
}

impl<P> Default for PuzzleFinished<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> fmt::Debug for PuzzleFinished<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PuzzleFinished")
            .field("puzzle", &std::any::type_name::<P>())
            .finish()
    }
}

impl<P: 'static> Event for PuzzleFinished<P> {}

/// A contestant pressed the buzzer.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuzzIn;

impl Event for BuzzIn {}

#[cfg(test)]
mod tests {
    use super::*;

    struct Riddle;

    #[tokio::test]
    async fn test_release_frees_the_buffer() {
        let mut event = VideoFrameEvent::new(Frame {
            sequence: 3,
            source: "frame-003.png".to_string(),
            data: vec![0u8; 256],
        });
        assert!(!event.is_released());

        event.release().await;

        assert!(event.is_released());
        assert!(event.frame().data.is_empty());
        assert_eq!(event.frame().sequence, 3);
    }

    #[test]
    fn test_puzzle_events_are_distinct_per_puzzle() {
        use std::any::TypeId;

        assert_ne!(
            TypeId::of::<PuzzleStarted<Riddle>>(),
            TypeId::of::<PuzzleStarted<()>>()
        );
        assert_eq!(PuzzleStarted::<Riddle>::new(9).frame(), 9);
        assert!(format!("{:?}", PuzzleFinished::<Riddle>::new()).contains("Riddle"));
    }
}
