//! SQLDeck Navigation Tabs - Tab container host
//!
//! Plugins register a [`TabHandler`] per tab kind. The host owns the open
//! tabs and drives their lifecycle (restore, can-close, unload, close) and
//! session persistence; handlers own the meaning of the tab state.

mod error;
mod handler;
mod service;
mod tab;

pub use error::{TabsError, TabsResult};
pub use handler::{TabCapabilities, TabGetter, TabHandler, TabLifecycle, TabSetter};
pub use service::NavigationTabsService;
pub use tab::{PersistedSession, PersistedTab, Tab, TabOptions, TabRef};
