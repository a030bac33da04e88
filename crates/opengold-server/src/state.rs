//! Shared application state for the Opengold server.
//!
//! [`AppState`] is built once at process start from the resolved
//! [`Settings`] and injected into every handler through Axum's `State`
//! extractor, wrapped in an [`Arc`].

use std::sync::Arc;

use opengold_game::GameEngine;

use crate::config::Settings;
use crate::error::ApiError;
use crate::longpoll::{LongPoll, Shutdown};
use crate::render::Renderer;
use crate::session::{SessionAware, SessionKeys};
use crate::templates::Templates;

/// Shared state for the Axum application.
pub struct AppState {
    /// The game rule engine and its event sources.
    pub engine: Arc<dyn GameEngine>,
    /// Keys for issuing and verifying session credentials.
    pub sessions: SessionKeys,
    /// Long-poll coordinator with the configured deadline.
    pub poll: LongPoll,
    /// Response renderer with the page templates loaded.
    pub renderer: Renderer,
    shutdown: Shutdown,
}

impl AppState {
    /// Build the state from the engine and startup settings.
    ///
    /// # Errors
    ///
    /// Fails if the signing secret is empty or the page templates cannot
    /// be loaded.
    pub fn new(engine: Arc<dyn GameEngine>, settings: &Settings) -> Result<Self, ApiError> {
        let sessions = SessionKeys::new(&settings.cookie_secret)?;
        let templates = Templates::load(settings.templates_dir.as_deref())?;
        let shutdown = Shutdown::new();
        let poll = LongPoll::new(settings.longpoll_timeout, shutdown.signal());

        Ok(Self {
            engine,
            sessions,
            poll,
            renderer: Renderer::new(templates, settings.js_path.clone()),
            shutdown,
        })
    }

    /// Handle used to cancel every in-flight long-poll.
    pub const fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }
}

impl SessionAware for AppState {
    fn session_keys(&self) -> &SessionKeys {
        &self.sessions
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("poll", &self.poll)
            .field("shutdown", &self.shutdown)
            .finish_non_exhaustive()
    }
}
