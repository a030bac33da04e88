//! Long-poll HTTP server for Opengold.
//!
//! This crate provides an Axum HTTP server that keeps browsers and the
//! JavaScript client in sync with a turn-based game:
//!
//! - **Long-poll reads** (`GET /`, `GET /{game}/`) that park until the
//!   game list or a game moves past the client's last-seen id, or until
//!   the configured deadline passes
//! - **Write actions** (`POST /{game}/join|start|move|chat`) that call the
//!   [`GameEngine`](opengold_game::GameEngine) and answer immediately
//! - **Per-game session cookies** signed with HMAC-SHA256
//! - **Content negotiation**: JSON for clients that ask for it, rendered
//!   pages and redirects for everyone else
//!
//! # Architecture
//!
//! A read request flows extractor → cursor → [`LongPoll`] → [`Renderer`].
//! The only suspension point is [`LongPoll::await_update`], which races
//! the cursor against the deadline and the shutdown signal. Write
//! requests never suspend; an accepted action advances the game's event
//! source, which is what wakes the parked readers.

pub mod actions;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod longpoll;
pub mod negotiate;
pub mod render;
pub mod router;
pub mod server;
pub mod session;
pub mod state;
pub mod templates;

// Re-export primary types for convenience.
pub use config::{ConfigError, ConfigFile, ModeConfig, Settings};
pub use error::ApiError;
pub use longpoll::{LongPoll, PollOutcome, Shutdown, ShutdownSignal};
pub use negotiate::{ResponseShape, wants_json};
pub use render::{ActionOutcome, Renderer};
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use session::{SessionAware, SessionError, SessionKeys};
pub use state::AppState;
