use serde::{Deserialize, Serialize};

use crate::errors::{BotError, BotResult};

pub const DEFAULT_TEAMS: usize = 2;

/// Registered event participants, stored as Discord user IDs in
/// registration order. Each ID appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantList {
    ids: Vec<String>,
}

impl ParticipantList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from arbitrary IDs, dropping repeats but keeping the
    /// position of the first occurrence.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Self::new();
        for id in ids {
            list.register(id);
        }
        list
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.ids.iter().any(|id| id == user_id)
    }

    /// Append a user. Returns `false` if they were already registered.
    pub fn register(&mut self, user_id: impl Into<String>) -> bool {
        let user_id = user_id.into();
        if self.contains(&user_id) {
            return false;
        }
        self.ids.push(user_id);
        true
    }

    /// Remove a user. Returns `false` if they were not registered.
    pub fn cancel(&mut self, user_id: &str) -> bool {
        let before = self.ids.len();
        self.ids.retain(|id| id != user_id);
        before != self.ids.len()
    }

    /// Split the list into `teams` consecutive groups whose sizes differ by
    /// at most one. The larger groups come first.
    pub fn divide(&self, teams: usize) -> BotResult<Vec<Vec<String>>> {
        if self.is_empty() {
            return Err(BotError::Validation(
                "The participants list is empty.".to_string(),
            ));
        }
        if teams < 2 {
            return Err(BotError::Validation(
                "The number of teams must be at least two.".to_string(),
            ));
        }
        if teams > self.len() {
            return Err(BotError::Validation(format!(
                "Cannot divide {} participants into {} teams.",
                self.len(),
                teams
            )));
        }

        let base = self.len() / teams;
        let remainder = self.len() % teams;

        let mut groups = Vec::with_capacity(teams);
        let mut start = 0;
        for i in 0..teams {
            let size = base + usize::from(i < remainder);
            groups.push(self.ids[start..start + size].to_vec());
            start += size;
        }

        Ok(groups)
    }

    /// Serialize the way the list file is written: a JSON array indented by
    /// four spaces.
    pub fn to_pretty_json(&self) -> BotResult<Vec<u8>> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        Ok(buf)
    }

    /// Parse an uploaded list. Anything other than an array of strings is
    /// rejected; duplicate IDs are collapsed.
    pub fn from_json_slice(bytes: &[u8]) -> BotResult<Self> {
        let ids: Vec<String> = serde_json::from_slice(bytes)?;
        Ok(Self::from_ids(ids))
    }
}
