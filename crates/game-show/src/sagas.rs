//! Puzzle-generic game saga and its Crosswords instantiation.

use async_trait::async_trait;
use event_bus::{HandlerResult, Saga, SagaContracts, SagaCore, SagaHandles, SagaStartedBy};

use crate::events::{BuzzIn, PuzzleFinished, PuzzleStarted};

/// A kind of puzzle the show can run.
///
/// The hooks customize a [`GameSaga`]; both default to doing nothing.
#[async_trait]
pub trait Puzzle: Default + Send + Sync + Sized + 'static {
    /// Per-round state, replaced with `Default` on every start.
    type State: Default + Send + Sync + 'static;

    /// Name used in logs.
    const NAME: &'static str;

    /// Runs right after a round starts, on the fresh state.
    async fn detect_question(&self, _state: &mut Self::State, _event: &PuzzleStarted<Self>) {}

    /// Runs when a contestant buzzes in during the round.
    async fn buzz_in(&self, _state: &mut Self::State) {}
}

/// Tracks one round of puzzle `P`.
///
/// Started by `PuzzleStarted<P>`, deactivated by `PuzzleFinished<P>`, and
/// reacts to every `BuzzIn` in between.
#[derive(Default)]
pub struct GameSaga<P: Puzzle> {
    puzzle: P,
    core: SagaCore<P::State>,
}

impl<P: Puzzle> GameSaga<P> {
    pub fn new(puzzle: P) -> Self {
        Self {
            puzzle,
            core: SagaCore::new(),
        }
    }

    /// Returns the state of the current or most recent round.
    pub fn state(&self) -> &P::State {
        self.core.state()
    }

    pub fn puzzle(&self) -> &P {
        &self.puzzle
    }
}

impl<P: Puzzle> Saga for GameSaga<P> {
    fn is_active(&self) -> bool {
        self.core.is_active()
    }

    fn reset(&mut self) {
        self.core.reset();
    }

    fn declare(contracts: &mut SagaContracts<Self>) {
        contracts
            .started_by::<PuzzleStarted<P>>()
            .handles::<PuzzleFinished<P>>()
            .handles::<BuzzIn>();
    }
}

#[async_trait]
impl<P: Puzzle> SagaStartedBy<PuzzleStarted<P>> for GameSaga<P> {
    async fn handle_start(&mut self, event: &PuzzleStarted<P>) -> HandlerResult {
        tracing::info!(puzzle = P::NAME, frame = event.frame(), "puzzle started");
        let state = self.core.begin();
        self.puzzle.detect_question(state, event).await;
        Ok(())
    }
}

#[async_trait]
impl<P: Puzzle> SagaHandles<PuzzleFinished<P>> for GameSaga<P> {
    async fn handle(&mut self, _event: &PuzzleFinished<P>) -> HandlerResult {
        tracing::info!(puzzle = P::NAME, "puzzle finished");
        self.core.reset();
        Ok(())
    }
}

#[async_trait]
impl<P: Puzzle> SagaHandles<BuzzIn> for GameSaga<P> {
    async fn handle(&mut self, _event: &BuzzIn) -> HandlerResult {
        self.puzzle.buzz_in(self.core.state_mut()).await;
        Ok(())
    }
}

/// The Crosswords puzzle.
#[derive(Debug, Clone, Copy, Default)]
pub struct Crosswords;

/// Round state of a Crosswords game.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrosswordsState {
    pub x: i32,
    /// Frame the round was detected on.
    pub frame: Option<u64>,
}

#[async_trait]
impl Puzzle for Crosswords {
    type State = CrosswordsState;

    const NAME: &'static str = "crosswords";

    async fn detect_question(&self, state: &mut CrosswordsState, event: &PuzzleStarted<Self>) {
        tracing::info!(frame = event.frame(), "detecting question");
        state.frame = Some(event.frame());
        state.x += 10;
    }

    async fn buzz_in(&self, state: &mut CrosswordsState) {
        tracing::info!(x = state.x, "buzz in");
        state.x += 10;
    }
}

pub type CrosswordsSaga = GameSaga<Crosswords>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_start_detects_question_on_fresh_state() {
        let mut saga = CrosswordsSaga::default();
        assert!(!saga.core.is_active());

        saga.handle_start(&PuzzleStarted::new(4)).await.unwrap();

        assert!(saga.core.is_active());
        assert_eq!(
            saga.state(),
            &CrosswordsState {
                x: 10,
                frame: Some(4)
            }
        );
    }

    #[tokio::test]
    async fn test_buzz_in_advances_x() {
        let mut saga = CrosswordsSaga::default();
        saga.handle_start(&PuzzleStarted::new(1)).await.unwrap();

        SagaHandles::<BuzzIn>::handle(&mut saga, &BuzzIn).await.unwrap();
        SagaHandles::<BuzzIn>::handle(&mut saga, &BuzzIn).await.unwrap();

        assert_eq!(saga.state().x, 30);
    }

    #[tokio::test]
    async fn test_finish_deactivates_and_keeps_state() {
        let mut saga = CrosswordsSaga::default();
        saga.handle_start(&PuzzleStarted::new(1)).await.unwrap();

        SagaHandles::<PuzzleFinished<Crosswords>>::handle(&mut saga, &PuzzleFinished::new())
            .await
            .unwrap();

        assert!(!saga.core.is_active());
        assert_eq!(saga.state().x, 10);
    }

    #[tokio::test]
    async fn test_restart_discards_previous_round() {
        let mut saga = CrosswordsSaga::default();
        saga.handle_start(&PuzzleStarted::new(1)).await.unwrap();
        SagaHandles::<BuzzIn>::handle(&mut saga, &BuzzIn).await.unwrap();

        saga.handle_start(&PuzzleStarted::new(2)).await.unwrap();

        assert_eq!(
            saga.state(),
            &CrosswordsState {
                x: 10,
                frame: Some(2)
            }
        );
    }

    /// Looks its question up before the round can proceed.
    #[derive(Default)]
    struct Trivia;

    #[async_trait]
    impl Puzzle for Trivia {
        type State = Option<String>;

        const NAME: &'static str = "trivia";

        async fn detect_question(&self, question: &mut Option<String>, event: &PuzzleStarted<Self>) {
            tokio::task::yield_now().await;
            *question = Some(format!("question-{}", event.frame()));
        }
    }

    #[tokio::test]
    async fn test_detect_question_can_suspend() {
        let mut saga = GameSaga::<Trivia>::default();

        saga.handle_start(&PuzzleStarted::new(12)).await.unwrap();
        SagaHandles::<BuzzIn>::handle(&mut saga, &BuzzIn).await.unwrap();

        assert!(saga.core.is_active());
        assert_eq!(saga.state().as_deref(), Some("question-12"));
    }
}
