//! SQLDeck Connection - Connection registry and execution contexts
//!
//! This crate tracks the connections known to the console, the live
//! execution contexts opened on them, and the disconnect/delete lifecycle
//! that other components react to.

mod execution_context;
mod manager;
mod registry;
mod storage;

pub use execution_context::{
    ConnectionExecutionContext, ConnectionExecutionContextResource,
    ConnectionExecutionContextService, ExecutionContextApi, LocalExecutionContextApi,
};
pub use manager::{ConnectionExecutorData, ConnectionExecutorState, ConnectionsManagerService};
pub use registry::ConnectionInfoResource;
pub use storage::{ConnectionSource, JsonConnectionStorage, MemoryConnectionSource};
