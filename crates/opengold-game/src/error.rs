//! Error types for the game engine boundary.

/// Faults raised by a [`GameEngine`](crate::GameEngine) or one of its
/// event sources.
///
/// A refused action (duplicate player name, illegal move) is *not* an
/// error: engine mutators report that as `Ok(false)`. These variants are
/// reserved for conditions where the engine cannot answer at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The event source behind a cursor was dropped, so the game is no
    /// longer addressable.
    #[error("event source for {0} is closed")]
    SourceClosed(String),

    /// The engine's internal state could not be accessed.
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    /// A version counter reached its maximum value.
    #[error("version counter exhausted for {0}")]
    VersionOverflow(String),
}
