pub mod mafia;
pub mod participants;
