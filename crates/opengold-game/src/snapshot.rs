//! Immutable snapshots handed to long-poll waiters.
//!
//! Every snapshot carries the `id` (version) it was taken at. Clients echo
//! that id back on their next poll so they only wake for newer state.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle phase of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Players may still join; nobody has started venturing.
    Joining,
    /// Rounds are being played; joining is closed.
    Playing,
}

/// A move a player can submit during a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Move {
    /// Keep going.
    Han,
    /// Head home with what you have.
    Lando,
}

impl FromStr for Move {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "han" => Ok(Self::Han),
            "lando" => Ok(Self::Lando),
            other => Err(format!("unknown move: {other}")),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Han => f.write_str("han"),
            Self::Lando => f.write_str("lando"),
        }
    }
}

/// What kind of happening an [`Update`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    /// A player joined.
    Joined,
    /// A player voted to start.
    StartVote,
    /// Everyone voted but there are too few players.
    Waiting,
    /// A new round began.
    Round,
    /// A player submitted a move.
    Move,
    /// A chat message.
    Chat,
}

/// One line of a game's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    /// Version at which this update happened.
    pub id: u64,
    /// Kind of update.
    pub kind: UpdateKind,
    /// Player responsible, if any.
    pub player: Option<String>,
    /// Display text.
    pub text: String,
    /// Wall-clock time the update was recorded.
    pub at: DateTime<Utc>,
}

/// A player as seen by everyone in the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    /// Display name.
    pub name: String,
    /// Whether they voted to start.
    pub wants_start: bool,
    /// Whether they already moved this round.
    pub moved: bool,
}

/// Snapshot of a single game from one viewer's perspective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameView {
    /// Version this snapshot was taken at.
    pub id: u64,
    /// Game name (unescaped).
    pub name: String,
    /// Current phase.
    pub phase: Phase,
    /// Current round, `0` before the game starts.
    pub round: u32,
    /// Everyone seated in the game, in join order.
    pub players: Vec<PlayerView>,
    /// The viewing player, if they are seated.
    pub you: Option<String>,
    /// The viewer's pending move this round. Hidden from other players.
    pub your_move: Option<Move>,
    /// Updates newer than the viewer's cursor (all updates without one).
    pub updates: Vec<Update>,
}

/// Summary line for the game list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSummary {
    /// Game name (unescaped).
    pub name: String,
    /// Seated player names.
    pub players: Vec<String>,
    /// Current phase.
    pub phase: Phase,
    /// Current round.
    pub round: u32,
}

/// Snapshot of every game that has at least one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameListing {
    /// Version of the game list this snapshot was taken at.
    pub id: u64,
    /// Games in name order.
    pub games: Vec<GameSummary>,
}
