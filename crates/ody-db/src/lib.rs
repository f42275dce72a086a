//! ody-db: database access and persistence layer.
//!
//! This crate provides SQLite-backed storage with connection pooling,
//! embedded migrations, typed models, and query modules for chat sessions,
//! the agent registry, the audit log, and mirrored exchange activity. It
//! also renders the static DROP POLICY script for the hosted database.

pub mod migrations;
pub mod models;
pub mod policies;
pub mod pool;
pub mod queries;
