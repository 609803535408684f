//! Real-time relay for two-player typing duels.
//!
//! The server pairs exactly two participants into a private room addressed
//! by a six-digit code and forwards gameplay events between them without
//! interpreting their content. A server-issued session token lets a client
//! survive transient disconnects: presenting the token on reconnect rebinds
//! the connection to its session and resumes room membership mid-match.
//!
//! Control flow per connection: [`gateway`] establishes the session, then
//! [`relay`] dispatches events, reading and writing the [`room`] registry
//! and the [`session`] store.

pub mod config;
pub mod error;
pub mod gateway;
pub mod protocol;
pub mod relay;
pub mod room;
pub mod server;
pub mod session;

pub use config::RelayConfig;
pub use error::{JoinGameError, RelayError};
pub use server::RelayServer;
