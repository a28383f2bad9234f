use std::collections::HashSet;

use crate::config::Settings;

pub const DENIED: &str = "You do not have permission to use this command.";

/// Who counts as developer, staff or event team, as configured in the
/// settings file.
#[derive(Debug, Clone, Default)]
pub struct Permissions {
    developers: HashSet<u64>,
    staff_roles: HashSet<u64>,
    event_team: HashSet<u64>,
}

impl Permissions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            developers: settings.developer.iter().copied().collect(),
            staff_roles: settings.staff_role_ids().into_iter().collect(),
            event_team: settings.event_team.iter().copied().collect(),
        }
    }

    pub fn is_dev(&self, user_id: u64) -> bool {
        self.developers.contains(&user_id)
    }

    /// True if any of the member's roles is a staff role.
    pub fn is_staff(&self, role_ids: impl IntoIterator<Item = u64>) -> bool {
        role_ids.into_iter().any(|id| self.staff_roles.contains(&id))
    }

    /// Event commands are open to the event team and to developers.
    pub fn is_event_team(&self, user_id: u64) -> bool {
        self.event_team.contains(&user_id) || self.is_dev(user_id)
    }
}
