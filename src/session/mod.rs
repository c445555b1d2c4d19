//! Session binding (C9): session state machine, an abstract session-store
//! interface, an in-memory implementation, and cookie attribute building.

mod cookie;
mod memory;
mod store;
mod types;

pub use cookie::{CookieConfig, CookiePriority, SameSite};
pub use memory::InMemorySessionStore;
pub use store::SessionStore;
pub use types::{SessionData, SessionState};
