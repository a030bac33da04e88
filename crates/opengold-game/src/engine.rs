//! The boundary between the HTTP layer and whatever owns the game rules.
//!
//! The server never mutates game state itself. It asks a [`GameEngine`]
//! to apply an action and observes the result through the cursors the
//! engine hands out.

use crate::error::EngineError;
use crate::snapshot::{GameListing, GameView};
use crate::source::Cursor;

/// A game rule engine with per-game event sources.
///
/// # Causal contract
///
/// Every mutator that returns `Ok(true)` *and* changed state must advance
/// the version of that game's event source (and of the game list), so
/// that any cursor parked behind the old version wakes up. A mutator that
/// changes nothing must not advance, so waiters are never woken
/// spuriously.
pub trait GameEngine: Send + Sync {
    /// Cursor over the list of all games.
    ///
    /// `since` is the last list version the client saw; `None` yields the
    /// current listing immediately.
    fn watch_games(&self, since: Option<u64>) -> Result<Cursor<GameListing>, EngineError>;

    /// Cursor over a single game as seen by `player` (`None` for an
    /// anonymous viewer).
    fn watch_game(
        &self,
        game: &str,
        player: Option<&str>,
        since: Option<u64>,
    ) -> Result<Cursor<GameView>, EngineError>;

    /// Seat `player` in `game`, creating the game if needed.
    fn join(&self, game: &str, player: &str) -> Result<bool, EngineError>;

    /// Record `player`'s vote to start (or continue) the game.
    fn start(&self, game: &str, player: &str) -> Result<bool, EngineError>;

    /// Submit `player`'s move for the current round.
    fn submit_move(&self, game: &str, player: &str, choice: &str) -> Result<bool, EngineError>;

    /// Post a chat message to everyone in `game`.
    fn chat(&self, game: &str, player: &str, message: &str) -> Result<bool, EngineError>;
}
