//! Page template loading and rendering via `minijinja`.
//!
//! The default pages are compiled into the binary. Setting
//! `templates_dir` in the config loads them from disk instead, so the
//! pages can be reworked without recompiling.

use std::path::Path;

use minijinja::{Environment, Value, path_loader};
use serde::Serialize;

use crate::error::ApiError;
use crate::render::game_path;

/// Template for the game list.
pub const GAMES_TEMPLATE: &str = "games.html";

/// Template for a single game.
pub const GAME_TEMPLATE: &str = "game.html";

const BUILTIN: [(&str, &str); 3] = [
    ("layout.html", include_str!("../templates/layout.html")),
    (GAMES_TEMPLATE, include_str!("../templates/games.html")),
    (GAME_TEMPLATE, include_str!("../templates/game.html")),
];

/// Wraps a `minijinja` [`Environment`] holding the page templates.
#[derive(Debug)]
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    /// The pages shipped with the server.
    pub fn builtin() -> Result<Self, ApiError> {
        let mut env = base_environment();
        for (name, source) in BUILTIN {
            env.add_template(name, source)
                .map_err(|e| ApiError::Template(format!("failed to add {name}: {e}")))?;
        }
        Ok(Self { env })
    }

    /// Pages loaded lazily from `dir`.
    ///
    /// Both page templates are resolved up front so a missing file fails
    /// at startup, not on the first request.
    pub fn from_dir(dir: &Path) -> Result<Self, ApiError> {
        let mut env = base_environment();
        env.set_loader(path_loader(dir));
        for name in [GAMES_TEMPLATE, GAME_TEMPLATE] {
            env.get_template(name).map_err(|e| {
                ApiError::Template(format!("failed to load {name} from {}: {e}", dir.display()))
            })?;
        }
        Ok(Self { env })
    }

    /// Built-in pages, or pages from `dir` when one is configured.
    pub fn load(dir: Option<&Path>) -> Result<Self, ApiError> {
        dir.map_or_else(Self::builtin, Self::from_dir)
    }

    /// Render template `name` with `ctx`.
    pub fn render<S: Serialize>(&self, name: &str, ctx: &S) -> Result<String, ApiError> {
        let html = self.env.get_template(name)?.render(ctx)?;
        Ok(html)
    }
}

/// Environment with the filters every page relies on.
///
/// `game_path` escapes a game name into its page URL. The stock
/// `urlencode` filter leaves `/` alone, which would split the path. Its
/// output is percent-encoded ASCII, so it is marked safe for HTML.
fn base_environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.add_filter("game_path", |name: &str| Value::from_safe_string(game_path(name)));
    env
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use minijinja::context;

    use super::*;

    #[test]
    fn empty_listing_page() {
        let templates = Templates::builtin().unwrap();
        let html = templates
            .render(
                GAMES_TEMPLATE,
                &context! { id => 0, games => Vec::<()>::new(), js_path => "/js" },
            )
            .unwrap();
        assert!(html.contains("No games currently available"));
        assert!(html.contains("/js/main.js"));
    }

    #[test]
    fn game_links_are_escaped() {
        let templates = Templates::builtin().unwrap();
        let games = vec![
            context! { name => "dark side", players => vec!["a"], phase => "joining", round => 0 },
            context! { name => "a/b", players => vec!["b"], phase => "playing", round => 2 },
        ];
        let html = templates
            .render(GAMES_TEMPLATE, &context! { id => 1, games => games, js_path => "/js" })
            .unwrap();
        assert!(html.contains("href=\"/dark%20side/\""));
        assert!(html.contains("href=\"/a%2Fb/\""));
        assert!(html.contains("round 2"));
    }

    #[test]
    fn anonymous_viewer_sees_join_form() {
        let templates = Templates::builtin().unwrap();
        let html = templates
            .render(
                GAME_TEMPLATE,
                &context! {
                    id => 0, name => "alpha", phase => "joining", round => 0,
                    players => Vec::<()>::new(), you => (), your_move => (),
                    updates => Vec::<()>::new(), js_path => "/js",
                },
            )
            .unwrap();
        assert!(html.contains("Join this game as"));
    }

    #[test]
    fn player_names_are_html_escaped() {
        let templates = Templates::builtin().unwrap();
        let html = templates
            .render(
                GAME_TEMPLATE,
                &context! {
                    id => 1, name => "<b>alpha</b>", phase => "joining", round => 0,
                    players => Vec::<()>::new(), you => "barrett", your_move => (),
                    updates => Vec::<()>::new(), js_path => "/js",
                },
            )
            .unwrap();
        assert!(!html.contains("<b>alpha</b>"));
        assert!(html.contains("Start venturing"));
    }

    #[test]
    fn missing_directory_fails_to_load() {
        let result = Templates::from_dir(Path::new("/nonexistent/opengold/templates"));
        assert!(matches!(result, Err(ApiError::Template(_))));
    }
}
