//! Typed client for the Podium leaderboard HTTP API.
//!
//! [`ApiClient`] wraps an [`HttpTransport`](podium_transport::HttpTransport)
//! and a fixed base URL. Each endpoint is one method, and every response is
//! parsed exactly once into `Result<T, ApiError>`:
//!
//! | Outcome | Result |
//! |---|---|
//! | transport failure | [`ApiError::Network`] |
//! | non-2xx | [`ApiError::Server`] with the body's `error` text |
//! | 2xx, empty / non-JSON / `null` | [`ApiError::EmptyResponse`] |
//! | 2xx, wrong shape | [`ApiError::Protocol`] |
//! | 2xx, expected shape | `Ok(T)` |

mod client;
mod error;

pub use client::{ApiClient, DEFAULT_BASE_URL};
pub use error::ApiError;
