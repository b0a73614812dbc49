//! Token store and request dispatcher for the Lapidar console.
//!
//! This crate holds the client-side state every backend call depends on
//! and the single choke point those calls pass through:
//!
//! 1. **Token store** ([`TokenStore`]): the session credential and the
//!    rotating anti-forgery token, optionally persisted to a file
//! 2. **Hooks** ([`Hook`], [`CsrfRotation`], [`BearerAuth`]): what gets
//!    attached to requests and taken from responses
//! 3. **Dispatcher** ([`Dispatcher`]): runs the hooks around a
//!    [`Transport`](lapidar_transport::Transport) and turns failures into
//!    [`DispatchError`]
//!
//! # How it fits in the stack
//!
//! ```text
//! Session / ConsoleClient (above)  ← typed operations
//!     ↕
//! Dispatch Layer (this crate)      ← tokens, hooks, error normalization
//!     ↕
//! Transport Layer (below)          ← HTTP, possibly through the failover proxy
//! ```
//!
//! # Feature Flags
//!
//! - `testing`: [`testing::ScriptedTransport`], a queue-driven fake
//!   backend for tests of crates built on the dispatcher

mod dispatcher;
mod error;
mod hooks;
mod store;
#[cfg(feature = "testing")]
pub mod testing;

pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use error::{DispatchError, StoreError};
pub use hooks::{BearerAuth, CsrfRotation, Hook};
pub use store::{TokenKey, TokenStore};
