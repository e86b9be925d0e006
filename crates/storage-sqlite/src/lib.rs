//! SQLite storage implementation for SignalGate.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the store traits defined in `signalgate-core` and contains:
//! - Database connection pooling and management
//! - Diesel migrations
//! - Repository implementations for exclusion and cooldown state
//! - Database-specific model types (with Diesel derives)
//!
//! # Architecture
//!
//! This crate is the only place in the workspace where Diesel dependencies exist.
//! `core` is database-agnostic and works with traits.
//!
//! ```text
//!            core (domain)
//!                  │
//!                  ▼
//!          storage-sqlite (this crate)
//!                  │
//!                  ▼
//!              SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod exclusions;
pub mod schema;
pub mod signals;
pub mod utils;

// Re-export database utilities
pub use db::{create_pool, get_connection, init, run_migrations, DbConnection, DbPool};

// Re-export repositories
pub use exclusions::ExclusionRepository;
pub use signals::CooldownRepository;

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

// Re-export from signalgate-core for convenience
pub use signalgate_core::errors::{DatabaseError, Error, Result};
