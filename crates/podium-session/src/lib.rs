//! Client-side session and auth state for Podium.
//!
//! This crate handles the lifecycle of the signed-in player:
//!
//! 1. **Credentials** — where the token and user live between runs
//!    ([`CredentialStore`], with [`MemoryStore`] and [`FileStore`])
//! 2. **Session state** — who is signed in right now ([`AuthManager`],
//!    published as [`AuthSnapshot`])
//! 3. **Restore** — picking a stored session back up and verifying it
//!    against the server, failing closed on rejection
//!
//! # How it fits in the stack
//!
//! ```text
//! Sync / app layer (above)  ← reads the bearer token for protected calls
//!     ↕
//! Session Layer (this crate)  ← owns the session and its storage
//!     ↕
//! API Layer (below)  ← login, verify, profile endpoints
//! ```

mod error;
mod manager;
mod session;
mod store;

pub use error::{SessionError, StorageError};
pub use manager::AuthManager;
pub use session::{AuthSnapshot, BearerToken, RestoreOutcome, Session};
pub use store::{CredentialStore, FileStore, MemoryStore, TOKEN_KEY, USER_KEY};
