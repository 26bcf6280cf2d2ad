//! State containers.
//!
//! Every store is an explicit, dependency-injected container created by
//! [`crate::state::AppState`] - there are no ambient singletons. Mutations
//! are single-writer: each operation takes the store's write lock once,
//! applies one atomic change, and recomputes derived values before
//! releasing, so operations land in the order their callers issued them.

pub mod cart;
pub mod session;
pub mod vault;

pub use cart::{CartItem, CartStore};
pub use session::{AuthError, Session, SessionStatus, SessionStore, TokenCell};
pub use vault::{FileBackend, MemoryBackend, StateVault, StorageBackend, StorageError};
