//! Discord-independent pieces of rizbot: the participant list and its JSON
//! store, the Mafia game model, the per-guild game registry and the phase
//! runner that drives a game through its rounds.

pub mod errors;
pub mod models;
pub mod registry;
pub mod rounds;
pub mod store;
