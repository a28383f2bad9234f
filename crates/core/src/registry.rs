use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::errors::{BotError, BotResult};
use crate::models::mafia::MafiaGame;

/// Running Mafia games, at most one per guild.
#[derive(Debug, Clone, Default)]
pub struct GameRegistry {
    games: Arc<RwLock<HashMap<u64, MafiaGame>>>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, guild_id: u64, game: MafiaGame) -> BotResult<()> {
        let mut games = self.games.write().await;
        if games.contains_key(&guild_id) {
            return Err(BotError::Conflict("A game is already in progress!".to_string()));
        }
        games.insert(guild_id, game);
        Ok(())
    }

    pub async fn contains(&self, guild_id: u64) -> bool {
        self.games.read().await.contains_key(&guild_id)
    }

    /// Run `f` against the guild's game while holding the write lock.
    pub async fn update<R>(
        &self,
        guild_id: u64,
        f: impl FnOnce(&mut MafiaGame) -> BotResult<R>,
    ) -> BotResult<R> {
        let mut games = self.games.write().await;
        let game = games
            .get_mut(&guild_id)
            .ok_or_else(|| BotError::NotFound("There is no game in progress.".to_string()))?;
        f(game)
    }

    pub async fn snapshot(&self, guild_id: u64) -> Option<MafiaGame> {
        self.games.read().await.get(&guild_id).cloned()
    }

    /// Remove the guild's game if `check` allows it, atomically.
    pub async fn remove_if(
        &self,
        guild_id: u64,
        check: impl FnOnce(&MafiaGame) -> BotResult<()>,
    ) -> BotResult<MafiaGame> {
        let mut games = self.games.write().await;
        let game = games
            .get(&guild_id)
            .ok_or_else(|| BotError::NotFound("There is no game in progress.".to_string()))?;
        check(game)?;
        games
            .remove(&guild_id)
            .ok_or_else(|| BotError::NotFound("There is no game in progress.".to_string()))
    }

    pub async fn remove(&self, guild_id: u64) -> Option<MafiaGame> {
        self.games.write().await.remove(&guild_id)
    }
}
