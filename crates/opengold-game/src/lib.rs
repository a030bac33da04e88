//! Game engine boundary for the Opengold server.
//!
//! The HTTP layer treats the game engine as a black box behind the
//! [`GameEngine`] trait. What it does rely on is the engine's event
//! sources: one [`EventSource`] per game (plus one for the game list)
//! whose version advances on every accepted mutation. Long-poll requests
//! park a [`Cursor`] on a source and wake when the version passes what the
//! client has already seen.
//!
//! [`MemoryEngine`] is an in-process implementation with minimal lobby and
//! round bookkeeping, used by the server binary and the test suites.

pub mod engine;
pub mod error;
pub mod memory;
pub mod snapshot;
pub mod source;

pub use engine::GameEngine;
pub use error::EngineError;
pub use memory::MemoryEngine;
pub use snapshot::{GameListing, GameSummary, GameView, Move, Phase, PlayerView, Update, UpdateKind};
pub use source::{Cursor, EventSource};
