//! SQLDeck Core - Shared types for the SQL editor console
//!
//! This crate provides the fundamental types that all other SQLDeck
//! crates depend on. It defines:
//!
//! - `ConnectionKey` / `ResourceKey` - Addressing connections and resources
//! - `ExecutionContextInfo` - Value snapshot of a live execution context
//! - `EventExecutor` - Serial publish/subscribe with interruption (veto)
//! - `NotificationService` - User-facing notifications backed by tracing
//! - `DeckError` - Core error type

mod connection;
mod error;
mod execution_context;
mod executor;
mod notification;
mod resource_key;

pub use connection::*;
pub use error::*;
pub use execution_context::*;
pub use executor::*;
pub use notification::*;
pub use resource_key::*;
