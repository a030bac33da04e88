//! In-memory reference engine.
//!
//! [`MemoryEngine`] keeps every game in a single mutex-guarded map and
//! implements just enough lobby and round bookkeeping to drive the HTTP
//! layer end to end. Each accepted mutation advances the game's
//! [`EventSource`] and the game-list source while the map lock is held,
//! so a woken waiter always loads the state that woke it.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::debug;

use crate::engine::GameEngine;
use crate::error::EngineError;
use crate::snapshot::{
    GameListing, GameSummary, GameView, Move, Phase, PlayerView, Update, UpdateKind,
};
use crate::source::{Cursor, EventSource};

/// Fewest players a game can start with.
const MIN_PLAYERS: usize = 2;

/// A [`GameEngine`] that keeps all state in process memory.
#[derive(Debug, Clone)]
pub struct MemoryEngine {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    /// Source for the game list; advanced on every accepted mutation.
    listing: EventSource,
    /// Games keyed by unescaped name.
    games: Mutex<BTreeMap<String, GameEntry>>,
}

/// A game's event source plus its table, which exists once someone joins.
#[derive(Debug)]
struct GameEntry {
    source: EventSource,
    table: Option<Table>,
}

#[derive(Debug)]
struct Table {
    phase: Phase,
    round: u32,
    seats: Vec<Seat>,
    updates: Vec<Update>,
}

#[derive(Debug)]
struct Seat {
    name: String,
    wants_start: bool,
    current_move: Option<Move>,
}

impl MemoryEngine {
    /// Create an engine with no games.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                listing: EventSource::new("games"),
                games: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    /// Current version of `game`, or `None` if nobody has joined it and no
    /// cursor is watching it.
    pub fn game_version(&self, game: &str) -> Result<Option<u64>, EngineError> {
        let games = self.inner.lock()?;
        Ok(games.get(game).map(|entry| entry.source.version()))
    }

    /// Number of long-poll waiters currently parked on `game`.
    pub fn game_waiters(&self, game: &str) -> Result<usize, EngineError> {
        let games = self.inner.lock()?;
        Ok(games.get(game).map_or(0, |entry| entry.source.waiters()))
    }

    /// Current version of the game list.
    pub fn listing_version(&self) -> u64 {
        self.inner.listing.version()
    }

    /// Number of long-poll waiters currently parked on the game list.
    pub fn listing_waiters(&self) -> usize {
        self.inner.listing.waiters()
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, GameEntry>>, EngineError> {
        self.games
            .lock()
            .map_err(|e| EngineError::Unavailable(format!("game table poisoned: {e}")))
    }

    /// Drop `game` if nobody has joined it and no cursor still watches it.
    fn release_unjoined(&self, game: &str) {
        let Ok(mut games) = self.games.lock() else {
            return;
        };
        let unused = games
            .get(game)
            .is_some_and(|entry| entry.table.is_none() && entry.source.subscribers() == 0);
        if unused {
            games.remove(game);
        }
    }

    /// Advance a game's source and the list source together.
    fn advance(&self, source: &EventSource) -> Result<u64, EngineError> {
        let id = source.advance()?;
        self.listing.advance()?;
        Ok(id)
    }

    fn listing(&self) -> Result<GameListing, EngineError> {
        let games = self.lock()?;
        let summaries = games
            .iter()
            .filter_map(|(name, entry)| {
                entry.table.as_ref().map(|table| GameSummary {
                    name: name.clone(),
                    players: table.seats.iter().map(|seat| seat.name.clone()).collect(),
                    phase: table.phase,
                    round: table.round,
                })
            })
            .collect();

        Ok(GameListing {
            id: self.listing.version(),
            games: summaries,
        })
    }

    fn view(
        &self,
        game: &str,
        player: Option<&str>,
        since: Option<u64>,
    ) -> Result<GameView, EngineError> {
        let games = self.lock()?;
        let entry = games
            .get(game)
            .ok_or_else(|| EngineError::SourceClosed(game.to_owned()))?;
        let id = entry.source.version();

        let Some(table) = &entry.table else {
            return Ok(GameView {
                id,
                name: game.to_owned(),
                phase: Phase::Joining,
                round: 0,
                players: Vec::new(),
                you: None,
                your_move: None,
                updates: Vec::new(),
            });
        };

        let seat = player.and_then(|name| table.seat(name));

        Ok(GameView {
            id,
            name: game.to_owned(),
            phase: table.phase,
            round: table.round,
            players: table
                .seats
                .iter()
                .map(|seat| PlayerView {
                    name: seat.name.clone(),
                    wants_start: seat.wants_start,
                    moved: seat.current_move.is_some(),
                })
                .collect(),
            you: seat.map(|seat| seat.name.clone()),
            your_move: seat.and_then(|seat| seat.current_move),
            updates: table
                .updates
                .iter()
                .filter(|update| since.is_none_or(|seen| update.id > seen))
                .cloned()
                .collect(),
        })
    }
}

impl GameEntry {
    fn new(game: &str) -> Self {
        Self {
            source: EventSource::new(game),
            table: None,
        }
    }
}

impl Table {
    const fn new() -> Self {
        Self {
            phase: Phase::Joining,
            round: 0,
            seats: Vec::new(),
            updates: Vec::new(),
        }
    }

    fn seat(&self, name: &str) -> Option<&Seat> {
        self.seats.iter().find(|seat| seat.name == name)
    }

    fn seat_mut(&mut self, name: &str) -> Option<&mut Seat> {
        self.seats.iter_mut().find(|seat| seat.name == name)
    }

    fn record(&mut self, id: u64, kind: UpdateKind, player: Option<&str>, text: String) {
        self.updates.push(Update {
            id,
            kind,
            player: player.map(str::to_owned),
            text,
            at: Utc::now(),
        });
    }

    fn begin_round(&mut self, id: u64) {
        self.round = self.round.saturating_add(1);
        for seat in &mut self.seats {
            seat.current_move = None;
        }
        let text = format!("Round {} has begun", self.round);
        self.record(id, UpdateKind::Round, None, text);
    }
}

impl GameEngine for MemoryEngine {
    fn watch_games(&self, since: Option<u64>) -> Result<Cursor<GameListing>, EngineError> {
        let inner = Arc::clone(&self.inner);
        Ok(self.inner.listing.cursor(since, move || inner.listing()))
    }

    fn watch_game(
        &self,
        game: &str,
        player: Option<&str>,
        since: Option<u64>,
    ) -> Result<Cursor<GameView>, EngineError> {
        let mut games = self.inner.lock()?;
        let entry = games
            .entry(game.to_owned())
            .or_insert_with(|| GameEntry::new(game));

        let inner = Arc::clone(&self.inner);
        let name = game.to_owned();
        let viewer = player.map(str::to_owned);
        let cursor = entry
            .source
            .cursor(since, move || inner.view(&name, viewer.as_deref(), since));

        // A viewer of a game nobody has joined holds the entry open only
        // while its cursor lives.
        let inner = Arc::clone(&self.inner);
        let name = game.to_owned();
        Ok(cursor.on_release(move || inner.release_unjoined(&name)))
    }

    fn join(&self, game: &str, player: &str) -> Result<bool, EngineError> {
        let player = player.trim();
        if player.is_empty() {
            return Ok(false);
        }

        let mut games = self.inner.lock()?;
        let entry = games
            .entry(game.to_owned())
            .or_insert_with(|| GameEntry::new(game));
        let table = entry.table.get_or_insert_with(Table::new);
        if table.phase != Phase::Joining || table.seat(player).is_some() {
            return Ok(false);
        }

        let id = self.inner.advance(&entry.source)?;
        table.seats.push(Seat {
            name: player.to_owned(),
            wants_start: false,
            current_move: None,
        });
        table.record(
            id,
            UpdateKind::Joined,
            Some(player),
            format!("{player} joined the game"),
        );

        debug!(game, player, version = id, "player joined");
        Ok(true)
    }

    fn start(&self, game: &str, player: &str) -> Result<bool, EngineError> {
        let mut games = self.inner.lock()?;
        let Some(entry) = games.get_mut(game) else {
            return Ok(false);
        };
        let Some(table) = entry.table.as_mut() else {
            return Ok(false);
        };
        if table.phase != Phase::Joining {
            return Ok(false);
        }
        match table.seat(player) {
            None => return Ok(false),
            // Repeat votes change nothing and must not wake anyone.
            Some(seat) if seat.wants_start => return Ok(true),
            Some(_) => {}
        }

        let id = self.inner.advance(&entry.source)?;
        if let Some(seat) = table.seat_mut(player) {
            seat.wants_start = true;
        }
        table.record(
            id,
            UpdateKind::StartVote,
            Some(player),
            format!("{player} wants to start venturing"),
        );

        if table.seats.iter().all(|seat| seat.wants_start) {
            if table.seats.len() < MIN_PLAYERS {
                table.record(
                    id,
                    UpdateKind::Waiting,
                    None,
                    String::from("Waiting for more players"),
                );
            } else {
                table.phase = Phase::Playing;
                table.begin_round(id);
            }
        }

        debug!(game, player, version = id, phase = ?table.phase, "start vote recorded");
        Ok(true)
    }

    fn submit_move(&self, game: &str, player: &str, choice: &str) -> Result<bool, EngineError> {
        let Ok(choice) = choice.parse::<Move>() else {
            return Ok(false);
        };

        let mut games = self.inner.lock()?;
        let Some(entry) = games.get_mut(game) else {
            return Ok(false);
        };
        let Some(table) = entry.table.as_mut() else {
            return Ok(false);
        };
        if table.phase != Phase::Playing {
            return Ok(false);
        }
        match table.seat(player) {
            Some(seat) if seat.current_move.is_none() => {}
            _ => return Ok(false),
        }

        let id = self.inner.advance(&entry.source)?;
        if let Some(seat) = table.seat_mut(player) {
            seat.current_move = Some(choice);
        }
        table.record(
            id,
            UpdateKind::Move,
            Some(player),
            format!("{player} made their move"),
        );

        if table.seats.iter().all(|seat| seat.current_move.is_some()) {
            let reveals: Vec<(String, String)> = table
                .seats
                .iter()
                .filter_map(|seat| {
                    seat.current_move
                        .map(|m| (seat.name.clone(), format!("{} went {m}", seat.name)))
                })
                .collect();
            for (name, text) in reveals {
                table.record(id, UpdateKind::Move, Some(name.as_str()), text);
            }
            table.begin_round(id);
        }

        debug!(game, player, version = id, round = table.round, "move submitted");
        Ok(true)
    }

    fn chat(&self, game: &str, player: &str, message: &str) -> Result<bool, EngineError> {
        let message = message.trim();
        if message.is_empty() {
            return Ok(true);
        }

        let mut games = self.inner.lock()?;
        let Some(entry) = games.get_mut(game) else {
            return Ok(false);
        };
        let Some(table) = entry.table.as_mut() else {
            return Ok(false);
        };
        if table.seat(player).is_none() {
            return Ok(false);
        }

        let id = self.inner.advance(&entry.source)?;
        table.record(
            id,
            UpdateKind::Chat,
            Some(player),
            format!("{player}: {message}"),
        );

        debug!(game, player, version = id, "chat posted");
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn texts(view: &GameView) -> Vec<String> {
        view.updates.iter().map(|u| u.text.clone()).collect()
    }

    async fn current_view(engine: &MemoryEngine, game: &str, player: Option<&str>) -> GameView {
        engine
            .watch_game(game, player, None)
            .unwrap()
            .next()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn listing_starts_empty() {
        let engine = MemoryEngine::new();
        let listing = engine.watch_games(None).unwrap().next().await.unwrap();
        assert_eq!(listing.id, 0);
        assert!(listing.games.is_empty());
    }

    #[tokio::test]
    async fn viewing_unknown_game_does_not_list_it() {
        let engine = MemoryEngine::new();
        let view = current_view(&engine, "nada", None).await;
        assert!(view.players.is_empty());
        assert_eq!(view.id, 0);

        let listing = engine.watch_games(None).unwrap().next().await.unwrap();
        assert!(listing.games.is_empty());
    }

    #[tokio::test]
    async fn anonymous_views_leave_no_entries() {
        let engine = MemoryEngine::new();
        for i in 0..500 {
            let game = format!("nobody-{i}");
            current_view(&engine, &game, None).await;
            assert_eq!(engine.game_version(&game).unwrap(), None);
        }
    }

    #[tokio::test]
    async fn parked_anonymous_viewer_wakes_on_first_join() {
        let engine = MemoryEngine::new();
        let mut cursor = engine.watch_game("alpha", None, Some(0)).unwrap();

        let waiter = tokio::spawn(async move { cursor.next().await });
        tokio::task::yield_now().await;
        assert_eq!(engine.game_waiters("alpha").unwrap(), 1);

        assert!(engine.join("alpha", "barrett").unwrap());
        let view = waiter.await.unwrap().unwrap();
        assert_eq!(texts(&view), vec!["barrett joined the game"]);
        assert_eq!(engine.game_version("alpha").unwrap(), Some(1));
    }

    #[tokio::test]
    async fn unjoined_entry_survives_while_another_cursor_watches() {
        let engine = MemoryEngine::new();
        let held = engine.watch_game("alpha", None, Some(0)).unwrap();
        current_view(&engine, "alpha", None).await;
        assert_eq!(engine.game_version("alpha").unwrap(), Some(0));

        drop(held);
        assert_eq!(engine.game_version("alpha").unwrap(), None);
    }

    #[tokio::test]
    async fn join_seats_player_and_advances_versions() {
        let engine = MemoryEngine::new();
        assert!(engine.join("alpha", "barrett").unwrap());
        assert_eq!(engine.game_version("alpha").unwrap(), Some(1));
        assert_eq!(engine.listing_version(), 1);

        let view = current_view(&engine, "alpha", Some("barrett")).await;
        assert_eq!(view.you.as_deref(), Some("barrett"));
        assert_eq!(texts(&view), vec!["barrett joined the game"]);
    }

    #[test]
    fn duplicate_or_empty_names_are_refused() {
        let engine = MemoryEngine::new();
        assert!(engine.join("alpha", "barrett").unwrap());
        assert!(!engine.join("alpha", "barrett").unwrap());
        assert!(!engine.join("alpha", "   ").unwrap());
        assert_eq!(engine.game_version("alpha").unwrap(), Some(1));
    }

    #[tokio::test]
    async fn lone_player_waits_for_more_players() {
        let engine = MemoryEngine::new();
        engine.join("cave", "hermit").unwrap();
        assert!(engine.start("cave", "hermit").unwrap());

        let view = current_view(&engine, "cave", Some("hermit")).await;
        assert_eq!(view.phase, Phase::Joining);
        assert!(texts(&view).iter().any(|t| t == "Waiting for more players"));
    }

    #[test]
    fn repeated_start_vote_does_not_advance() {
        let engine = MemoryEngine::new();
        engine.join("cave", "hermit").unwrap();
        engine.start("cave", "hermit").unwrap();
        let version = engine.game_version("cave").unwrap();
        assert!(engine.start("cave", "hermit").unwrap());
        assert_eq!(engine.game_version("cave").unwrap(), version);
    }

    #[tokio::test]
    async fn two_votes_start_round_one() {
        let engine = MemoryEngine::new();
        engine.join("hill", "jack").unwrap();
        engine.start("hill", "jack").unwrap();
        engine.join("hill", "jill").unwrap();
        engine.start("hill", "jill").unwrap();

        let view = current_view(&engine, "hill", Some("jack")).await;
        assert_eq!(view.phase, Phase::Playing);
        assert_eq!(view.round, 1);
        assert!(!engine.join("hill", "latecomer").unwrap());
    }

    #[tokio::test]
    async fn all_moves_advance_the_round() {
        let engine = MemoryEngine::new();
        for player in ["jack", "jill"] {
            engine.join("hill", player).unwrap();
            engine.start("hill", player).unwrap();
        }

        assert!(engine.submit_move("hill", "jack", "han").unwrap());
        assert!(!engine.submit_move("hill", "jack", "lando").unwrap());

        let view = current_view(&engine, "hill", Some("jack")).await;
        assert_eq!(view.your_move, Some(Move::Han));
        let other = current_view(&engine, "hill", Some("jill")).await;
        assert_eq!(other.your_move, None);
        assert!(other.players.iter().any(|p| p.name == "jack" && p.moved));

        assert!(engine.submit_move("hill", "jill", "lando").unwrap());
        let view = current_view(&engine, "hill", Some("jack")).await;
        assert_eq!(view.round, 2);
        assert!(texts(&view).iter().any(|t| t == "jill went lando"));
    }

    #[test]
    fn moves_before_start_or_unknown_are_refused() {
        let engine = MemoryEngine::new();
        engine.join("hill", "jack").unwrap();
        assert!(!engine.submit_move("hill", "jack", "han").unwrap());
        assert!(!engine.submit_move("hill", "jack", "chewie").unwrap());
        assert!(!engine.submit_move("nowhere", "jack", "han").unwrap());
    }

    #[test]
    fn chat_requires_a_seat_and_skips_empty_messages() {
        let engine = MemoryEngine::new();
        engine.join("alpha", "barrett").unwrap();
        assert!(!engine.chat("alpha", "stranger", "hi").unwrap());
        assert!(engine.chat("alpha", "barrett", "  ").unwrap());
        assert_eq!(engine.game_version("alpha").unwrap(), Some(1));
        assert!(engine.chat("alpha", "barrett", "hello").unwrap());
        assert_eq!(engine.game_version("alpha").unwrap(), Some(2));
    }

    #[tokio::test]
    async fn updates_are_filtered_by_cursor() {
        let engine = MemoryEngine::new();
        engine.join("alpha", "barrett").unwrap();
        engine.chat("alpha", "barrett", "hello").unwrap();

        let view = engine
            .watch_game("alpha", Some("barrett"), Some(1))
            .unwrap()
            .next()
            .await
            .unwrap();
        assert_eq!(view.id, 2);
        assert_eq!(texts(&view), vec!["barrett: hello"]);
    }

    #[tokio::test]
    async fn waiter_wakes_on_join() {
        let engine = MemoryEngine::new();
        let mut cursor = engine.watch_games(Some(0)).unwrap();
        let waiter = tokio::spawn(async move { cursor.next().await });
        tokio::task::yield_now().await;
        assert_eq!(engine.listing_waiters(), 1);

        engine.join("alpha", "barrett").unwrap();
        let listing = waiter.await.unwrap().unwrap();
        assert_eq!(listing.id, 1);
        assert_eq!(listing.games.len(), 1);
        assert_eq!(engine.listing_waiters(), 0);
    }
}
