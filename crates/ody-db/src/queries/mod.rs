//! Database query modules.

pub mod agents;
pub mod audit;
pub mod chat_sessions;
pub mod portfolio;
pub mod trades;
