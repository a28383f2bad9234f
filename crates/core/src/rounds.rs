//! The Mafia round loop: day, voting and night repeat until one side wins.
//!
//! Everything a player sees goes through [`MafiaTable`]; the loop itself only
//! waits out the phase timers and moves the shared game state forward. Player
//! input (votes, night targets) reaches the game through the
//! [`GameRegistry`] while a phase is open.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{error, info};

use crate::errors::{BotError, BotResult};
use crate::models::mafia::{GameSummary, NightOutcome, PhaseTimings, VoteOutcome, Winner};
use crate::registry::GameRegistry;

/// The channel a game is played in.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MafiaTable: Send + Sync {
    async fn announce_day(&self, duration: Duration) -> BotResult<()>;

    /// Post the voting prompt and return its message ID.
    async fn open_vote(&self, candidates: Vec<u64>, duration: Duration) -> BotResult<u64>;

    async fn announce_vote(&self, outcome: VoteOutcome) -> BotResult<()>;

    /// Post the night prompt and return its message ID.
    async fn open_night(&self, candidates: Vec<u64>, duration: Duration) -> BotResult<u64>;

    async fn announce_night(&self, outcome: NightOutcome) -> BotResult<()>;

    /// Take the interactive components off a prompt.
    async fn close_prompt(&self, message_id: u64) -> BotResult<()>;

    /// Give an eliminated player the ghost role.
    async fn mark_ghost(&self, user_id: u64) -> BotResult<()>;

    async fn end_game(&self, summary: GameSummary) -> BotResult<()>;
}

/// Play rounds until the game is decided, then remove it from the registry
/// and announce the result.
pub async fn run_rounds<T: MafiaTable + ?Sized>(
    table: &T,
    registry: &GameRegistry,
    guild_id: u64,
    timings: PhaseTimings,
) -> BotResult<Winner> {
    let winner = loop {
        registry
            .update(guild_id, |game| {
                game.begin_day();
                Ok(())
            })
            .await?;
        info!("Guild {}: day phase", guild_id);
        table.announce_day(timings.day).await?;
        sleep(timings.day).await;

        let candidates = registry
            .update(guild_id, |game| {
                game.begin_voting();
                Ok(game.living_players())
            })
            .await?;
        info!("Guild {}: voting phase", guild_id);
        let prompt = table.open_vote(candidates, timings.voting).await?;
        sleep(timings.voting).await;
        table.close_prompt(prompt).await?;

        let (outcome, decided) = registry
            .update(guild_id, |game| {
                let outcome = game.resolve_vote();
                let decided = match outcome {
                    VoteOutcome::Eliminated { .. } => game.winner(),
                    _ => None,
                };
                Ok((outcome, decided))
            })
            .await?;
        info!("Guild {}: vote resolved as {:?}", guild_id, outcome);
        if let VoteOutcome::Eliminated { user_id, .. } = outcome {
            mark_ghost(table, guild_id, user_id).await;
        }
        table.announce_vote(outcome).await?;
        if let Some(winner) = decided {
            break winner;
        }

        let candidates = registry
            .update(guild_id, |game| {
                game.begin_night();
                Ok(game.living_players())
            })
            .await?;
        info!("Guild {}: night phase", guild_id);
        let prompt = table.open_night(candidates, timings.night).await?;
        sleep(timings.night).await;
        table.close_prompt(prompt).await?;

        let (outcome, decided) = registry
            .update(guild_id, |game| {
                let outcome = game.resolve_night();
                let decided = match outcome {
                    NightOutcome::Killed(_) => game.winner(),
                    NightOutcome::NoTarget => None,
                };
                Ok((outcome, decided))
            })
            .await?;
        info!("Guild {}: night resolved as {:?}", guild_id, outcome);
        if let NightOutcome::Killed(user_id) = outcome {
            mark_ghost(table, guild_id, user_id).await;
        }
        table.announce_night(outcome).await?;
        if let Some(winner) = decided {
            break winner;
        }
    };

    let game = registry
        .remove(guild_id)
        .await
        .ok_or_else(|| BotError::NotFound("There is no game in progress.".to_string()))?;
    info!("Guild {}: game over, {} win", guild_id, winner);
    table.end_game(game.summary(winner)).await?;

    Ok(winner)
}

/// The ghost role is cosmetic; the game goes on without it.
async fn mark_ghost<T: MafiaTable + ?Sized>(table: &T, guild_id: u64, user_id: u64) {
    if let Err(e) = table.mark_ghost(user_id).await {
        error!("Guild {}: could not mark {} as a ghost: {}", guild_id, user_id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::mafia::MafiaGame;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const GUILD: u64 = 42;

    async fn three_player_game(registry: &GameRegistry) -> (u64, Vec<u64>) {
        let mut game = MafiaGame::new(1, 1, 7).unwrap();
        game.join(2).unwrap();
        game.join(3).unwrap();
        game.start(1, &mut StdRng::seed_from_u64(9)).unwrap();

        let murderer = game.murderers()[0];
        let town = game
            .players()
            .iter()
            .copied()
            .filter(|id| *id != murderer)
            .collect();
        registry.create(GUILD, game).await.unwrap();
        (murderer, town)
    }

    #[tokio::test(start_paused = true)]
    async fn town_wins_by_voting_out_the_murderer() {
        let registry = GameRegistry::new();
        let (murderer, town) = three_player_game(&registry).await;

        let voters = registry.clone();
        let town_votes = town.clone();
        tokio::spawn(async move {
            // Day lasts 20s; the vote is open from 20s to 35s.
            sleep(Duration::from_secs(25)).await;
            voters
                .update(GUILD, |game| {
                    for voter in &town_votes {
                        game.cast_vote(*voter, murderer)?;
                    }
                    game.cast_vote(murderer, town_votes[0])
                })
                .await
                .unwrap();
        });

        let mut table = MockMafiaTable::new();
        table.expect_announce_day().times(1).returning(|_| Ok(()));
        table
            .expect_open_vote()
            .withf(|candidates, _| candidates.len() == 3)
            .times(1)
            .returning(|_, _| Ok(100));
        table
            .expect_close_prompt()
            .withf(|id| *id == 100)
            .times(1)
            .returning(|_| Ok(()));
        table
            .expect_mark_ghost()
            .withf(move |id| *id == murderer)
            .times(1)
            .returning(|_| Ok(()));
        table
            .expect_announce_vote()
            .withf(move |outcome| {
                *outcome
                    == VoteOutcome::Eliminated {
                        user_id: murderer,
                        was_murderer: true,
                    }
            })
            .times(1)
            .returning(|_| Ok(()));
        table.expect_open_night().never();
        table
            .expect_end_game()
            .withf(move |summary| {
                summary.winner == Winner::Civilians && summary.murderers == vec![murderer]
            })
            .times(1)
            .returning(|_| Ok(()));

        let winner = run_rounds(&table, &registry, GUILD, PhaseTimings::default())
            .await
            .unwrap();

        assert_eq!(winner, Winner::Civilians);
        assert!(!registry.contains(GUILD).await);
    }

    #[tokio::test(start_paused = true)]
    async fn murderers_win_after_a_night_kill() {
        let registry = GameRegistry::new();
        let (murderer, town) = three_player_game(&registry).await;
        let victim = town[0];

        let killer = registry.clone();
        tokio::spawn(async move {
            // Nobody votes; the night is open from 35s to 55s.
            sleep(Duration::from_secs(40)).await;
            killer
                .update(GUILD, |game| game.choose_target(murderer, victim))
                .await
                .unwrap();
        });

        let mut table = MockMafiaTable::new();
        table.expect_announce_day().times(1).returning(|_| Ok(()));
        table.expect_open_vote().times(1).returning(|_, _| Ok(100));
        table
            .expect_announce_vote()
            .withf(|outcome| *outcome == VoteOutcome::NoVotes)
            .times(1)
            .returning(|_| Ok(()));
        table.expect_open_night().times(1).returning(|_, _| Ok(200));
        table.expect_close_prompt().times(2).returning(|_| Ok(()));
        table
            .expect_mark_ghost()
            .withf(move |id| *id == victim)
            .times(1)
            .returning(|_| Ok(()));
        table
            .expect_announce_night()
            .withf(move |outcome| *outcome == NightOutcome::Killed(victim))
            .times(1)
            .returning(|_| Ok(()));
        table
            .expect_end_game()
            .withf(|summary| summary.winner == Winner::Murderers && summary.players.len() == 3)
            .times(1)
            .returning(|_| Ok(()));

        let winner = run_rounds(&table, &registry, GUILD, PhaseTimings::default())
            .await
            .unwrap();

        assert_eq!(winner, Winner::Murderers);
    }

    #[tokio::test(start_paused = true)]
    async fn a_vanished_game_stops_the_loop() {
        let registry = GameRegistry::new();
        let table = MockMafiaTable::new();

        let err = run_rounds(&table, &registry, GUILD, PhaseTimings::default())
            .await
            .unwrap_err();

        assert!(matches!(err, BotError::NotFound(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn failing_ghost_role_does_not_stop_the_game() {
        let registry = GameRegistry::new();
        let (murderer, town) = three_player_game(&registry).await;

        let voters = registry.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(25)).await;
            voters
                .update(GUILD, |game| {
                    for voter in &town {
                        game.cast_vote(*voter, murderer)?;
                    }
                    Ok(())
                })
                .await
                .unwrap();
        });

        let mut table = MockMafiaTable::new();
        table.expect_announce_day().times(1).returning(|_| Ok(()));
        table.expect_open_vote().times(1).returning(|_, _| Ok(100));
        table.expect_close_prompt().times(1).returning(|_| Ok(()));
        table
            .expect_mark_ghost()
            .times(1)
            .returning(|_| Err(BotError::Internal(eyre::eyre!("Missing Permissions"))));
        table
            .expect_announce_vote()
            .withf(move |outcome| {
                *outcome
                    == VoteOutcome::Eliminated {
                        user_id: murderer,
                        was_murderer: true,
                    }
            })
            .times(1)
            .returning(|_| Ok(()));
        table
            .expect_end_game()
            .withf(|summary| summary.winner == Winner::Civilians)
            .times(1)
            .returning(|_| Ok(()));

        let winner = run_rounds(&table, &registry, GUILD, PhaseTimings::default())
            .await
            .unwrap();

        assert_eq!(winner, Winner::Civilians);
        assert!(!registry.contains(GUILD).await);
    }
}
