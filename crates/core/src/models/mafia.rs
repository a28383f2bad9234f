use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Duration;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::errors::{BotError, BotResult};

pub const MIN_MURDERERS: usize = 1;
pub const MAX_MURDERERS: usize = 3;
/// Every living player has to fit in one Discord select menu.
pub const MAX_PLAYERS: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Mafia,
    Townsperson,
    /// An eliminated townsperson.
    Ghost,
    /// An eliminated murderer.
    GhostMafia,
}

impl Role {
    pub fn is_alive(self) -> bool {
        matches!(self, Role::Mafia | Role::Townsperson)
    }

    pub fn is_murderer(self) -> bool {
        matches!(self, Role::Mafia | Role::GhostMafia)
    }

    fn eliminated(self) -> Role {
        if self.is_murderer() {
            Role::GhostMafia
        } else {
            Role::Ghost
        }
    }

    /// Private message shown when a player looks at their role.
    pub fn briefing(self) -> &'static str {
        match self {
            Role::Mafia => {
                "You are a **Murderer**! You must kill everyone without getting caught to win the game."
            }
            Role::Townsperson => {
                "You are a **Townsperson**! You must catch the murderer(s) before they kill everyone to win the game."
            }
            Role::Ghost | Role::GhostMafia => "You are a **Ghost**. You can no longer take part.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Lobby,
    RoleReveal,
    Day,
    Voting,
    Night,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    Civilians,
    Murderers,
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Winner::Civilians => write!(f, "Civilians"),
            Winner::Murderers => write!(f, "Murderer(s)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    NoVotes,
    Tie,
    Eliminated { user_id: u64, was_murderer: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NightOutcome {
    NoTarget,
    Killed(u64),
}

/// How long each timed phase stays open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseTimings {
    #[serde(with = "seconds", rename = "day_seconds")]
    pub day: Duration,
    #[serde(with = "seconds", rename = "voting_seconds")]
    pub voting: Duration,
    #[serde(with = "seconds", rename = "night_seconds")]
    pub night: Duration,
}

impl Default for PhaseTimings {
    fn default() -> Self {
        Self {
            day: Duration::from_secs(20),
            voting: Duration::from_secs(15),
            night: Duration::from_secs(20),
        }
    }
}

mod seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// What is left to announce once a game is decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSummary {
    pub winner: Winner,
    pub murderers: Vec<u64>,
    pub players: Vec<u64>,
}

/// One guild's Mafia game, from lobby to the final round.
#[derive(Debug, Clone)]
pub struct MafiaGame {
    host: u64,
    channel_id: u64,
    murderers: usize,
    players: Vec<u64>,
    roles: HashMap<u64, Role>,
    viewed_roles: HashSet<u64>,
    phase: Phase,
    votes: HashMap<u64, u64>,
    night_target: Option<u64>,
    pub setup_message_id: Option<u64>,
    pub game_message_id: Option<u64>,
}

impl MafiaGame {
    pub fn new(host: u64, murderers: usize, channel_id: u64) -> BotResult<Self> {
        if !(MIN_MURDERERS..=MAX_MURDERERS).contains(&murderers) {
            return Err(BotError::Validation(format!(
                "The number of murderers must be between {} and {}.",
                MIN_MURDERERS, MAX_MURDERERS
            )));
        }

        Ok(Self {
            host,
            channel_id,
            murderers,
            players: vec![host],
            roles: HashMap::new(),
            viewed_roles: HashSet::new(),
            phase: Phase::Lobby,
            votes: HashMap::new(),
            night_target: None,
            setup_message_id: None,
            game_message_id: None,
        })
    }

    pub fn host(&self) -> u64 {
        self.host
    }

    pub fn channel_id(&self) -> u64 {
        self.channel_id
    }

    pub fn murderer_count(&self) -> usize {
        self.murderers
    }

    pub fn players(&self) -> &[u64] {
        &self.players
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_started(&self) -> bool {
        self.phase != Phase::Lobby
    }

    pub fn role_of(&self, user_id: u64) -> Option<Role> {
        self.roles.get(&user_id).copied()
    }

    pub fn has_viewed_role(&self, user_id: u64) -> bool {
        self.viewed_roles.contains(&user_id)
    }

    pub fn votes(&self) -> &HashMap<u64, u64> {
        &self.votes
    }

    pub fn night_target(&self) -> Option<u64> {
        self.night_target
    }

    pub fn join(&mut self, user_id: u64) -> BotResult<()> {
        if self.is_started() {
            return Err(BotError::Conflict("The game has already started.".to_string()));
        }
        if self.players.contains(&user_id) {
            return Err(BotError::Validation("You are already in the game!".to_string()));
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(BotError::Conflict("The game is full.".to_string()));
        }
        self.players.push(user_id);
        Ok(())
    }

    /// Close the lobby. Only the host, or staff, may do so.
    pub fn dismiss(&self, user_id: u64, is_staff: bool) -> BotResult<()> {
        if user_id != self.host && !is_staff {
            return Err(BotError::Permission("Only the host can stop the game!".to_string()));
        }
        if self.is_started() {
            return Err(BotError::Conflict("The game has already started.".to_string()));
        }
        Ok(())
    }

    /// Deal the roles and leave the lobby.
    pub fn start<R: Rng + ?Sized>(&mut self, user_id: u64, rng: &mut R) -> BotResult<()> {
        if user_id != self.host {
            return Err(BotError::Permission("Only the host can start the game!".to_string()));
        }
        if self.is_started() {
            return Err(BotError::Conflict("The game has already started.".to_string()));
        }
        if self.players.len() <= self.murderers + 1 {
            return Err(BotError::Validation("✋ Let more players join.".to_string()));
        }

        let mut deck: Vec<Role> = std::iter::repeat(Role::Mafia)
            .take(self.murderers)
            .chain(std::iter::repeat(Role::Townsperson).take(self.players.len() - self.murderers))
            .collect();
        deck.shuffle(rng);

        self.roles = self.players.iter().copied().zip(deck).collect();
        self.phase = Phase::RoleReveal;
        Ok(())
    }

    /// Look up a player's role and remember that they have seen it.
    pub fn view_role(&mut self, user_id: u64) -> BotResult<Role> {
        let role = self
            .role_of(user_id)
            .ok_or_else(|| BotError::NotFound("You haven't joined this game.".to_string()))?;
        self.viewed_roles.insert(user_id);
        Ok(role)
    }

    pub fn everyone_viewed(&self) -> bool {
        self.is_started() && self.players.iter().all(|id| self.viewed_roles.contains(id))
    }

    /// Leave the role reveal once every player has seen their role. Returns
    /// `true` only for the call that makes the transition.
    pub fn finish_reveal(&mut self) -> bool {
        if self.phase == Phase::RoleReveal && self.everyone_viewed() {
            self.phase = Phase::Day;
            true
        } else {
            false
        }
    }

    /// Living players, in join order.
    pub fn living_players(&self) -> Vec<u64> {
        self.players
            .iter()
            .copied()
            .filter(|id| self.role_of(*id).is_some_and(Role::is_alive))
            .collect()
    }

    /// Every murderer, eliminated or not, in join order.
    pub fn murderers(&self) -> Vec<u64> {
        self.players
            .iter()
            .copied()
            .filter(|id| self.role_of(*id).is_some_and(Role::is_murderer))
            .collect()
    }

    pub fn begin_day(&mut self) {
        self.phase = Phase::Day;
    }

    pub fn begin_voting(&mut self) {
        self.phase = Phase::Voting;
        self.votes.clear();
    }

    pub fn begin_night(&mut self) {
        self.phase = Phase::Night;
        self.night_target = None;
    }

    /// Record a vote. A later vote from the same player replaces the earlier one.
    pub fn cast_vote(&mut self, voter: u64, votee: u64) -> BotResult<()> {
        if self.phase != Phase::Voting {
            return Err(BotError::Conflict("Voting is closed.".to_string()));
        }
        if !self.role_of(voter).is_some_and(Role::is_alive) {
            return Err(BotError::Permission("You are not allowed to vote.".to_string()));
        }
        if !self.role_of(votee).is_some_and(Role::is_alive) {
            return Err(BotError::Validation(
                "That player is no longer in the game.".to_string(),
            ));
        }
        self.votes.insert(voter, votee);
        Ok(())
    }

    /// Record the murderers' choice for the night. The latest choice wins.
    pub fn choose_target(&mut self, killer: u64, target: u64) -> BotResult<()> {
        if self.phase != Phase::Night {
            return Err(BotError::Conflict("The night is over.".to_string()));
        }
        match self.role_of(killer) {
            None | Some(Role::GhostMafia) => {
                Err(BotError::Permission("You are not allowed to kill.".to_string()))
            }
            Some(Role::Mafia) => match self.role_of(target) {
                Some(Role::Mafia) => Err(BotError::Validation(
                    "You cannot target another Mafia member.".to_string(),
                )),
                Some(Role::Townsperson) => {
                    self.night_target = Some(target);
                    Ok(())
                }
                _ => Err(BotError::Validation(
                    "That player is no longer in the game.".to_string(),
                )),
            },
            Some(Role::Townsperson) | Some(Role::Ghost) => Err(BotError::Permission(
                "Only murderers can select a target.".to_string(),
            )),
        }
    }

    /// Count the votes and eliminate the single most voted player, if any.
    pub fn resolve_vote(&mut self) -> VoteOutcome {
        if self.votes.is_empty() {
            return VoteOutcome::NoVotes;
        }

        let mut counts: HashMap<u64, usize> = HashMap::new();
        for votee in self.votes.values() {
            *counts.entry(*votee).or_insert(0) += 1;
        }

        let max_votes = counts.values().copied().max().unwrap_or(0);
        let leaders: Vec<u64> = counts
            .iter()
            .filter(|&(_, count)| *count == max_votes)
            .map(|(id, _)| *id)
            .collect();

        match leaders.as_slice() {
            [user_id] => {
                let was_murderer = self.eliminate(*user_id).is_some_and(Role::is_murderer);
                VoteOutcome::Eliminated { user_id: *user_id, was_murderer }
            }
            _ => VoteOutcome::Tie,
        }
    }

    /// Carry out the murderers' choice, if they made one.
    pub fn resolve_night(&mut self) -> NightOutcome {
        match self.night_target.take() {
            Some(target) if self.role_of(target).is_some_and(Role::is_alive) => {
                self.eliminate(target);
                NightOutcome::Killed(target)
            }
            _ => NightOutcome::NoTarget,
        }
    }

    pub fn winner(&self) -> Option<Winner> {
        let living_murderers = self.roles.values().filter(|r| **r == Role::Mafia).count();
        let living_town = self.roles.values().filter(|r| **r == Role::Townsperson).count();

        if living_murderers == 0 {
            Some(Winner::Civilians)
        } else if living_town <= living_murderers {
            Some(Winner::Murderers)
        } else {
            None
        }
    }

    pub fn summary(&self, winner: Winner) -> GameSummary {
        GameSummary {
            winner,
            murderers: self.murderers(),
            players: self.players.clone(),
        }
    }

    fn eliminate(&mut self, user_id: u64) -> Option<Role> {
        let role = self.roles.get_mut(&user_id)?;
        let previous = *role;
        *role = previous.eliminated();
        Some(previous)
    }
}
