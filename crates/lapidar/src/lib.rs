//! # Lapidar
//!
//! Management console core for the Lapidar bot.
//!
//! The console's pages only render data. Everything with state, retries,
//! or failure handling lives in the crates re-exported here:
//!
//! - [`transport`]: HTTP exchange types and the `Transport` seam
//! - [`protocol`]: wire types, the bot configuration, port validation
//! - [`dispatch`]: the token store and the request dispatcher
//! - [`session`]: the two-step login state machine
//! - [`proxy`]: the failover front door
//!
//! [`ConsoleClient`] ties them together for the data operations.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lapidar::prelude::*;
//!
//! # async fn run() -> Result<(), LapidarError> {
//! let store = TokenStore::open("session.json")?;
//! let client = ConsoleClient::connect(
//!     HttpTransportConfig::new("http://localhost:3000/api"),
//!     store,
//! )?;
//!
//! let state = match client.login_state() {
//!     LoginState::Credentials(step) => step
//!         .submit_credentials(client.dispatcher(), "admin@example.com", "secret")
//!         .await
//!         .into(),
//!     other => other,
//! };
//!
//! if state.is_authenticated() {
//!     for command in client.list_commands().await? {
//!         println!("{} enabled={}", command.name, command.enabled);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
pub mod telemetry;

pub use client::ConsoleClient;
pub use error::LapidarError;

pub use lapidar_dispatch as dispatch;
pub use lapidar_protocol as protocol;
pub use lapidar_proxy as proxy;
pub use lapidar_session as session;
pub use lapidar_transport as transport;

pub mod prelude {
    pub use crate::{ConsoleClient, LapidarError};
    pub use lapidar_dispatch::{Dispatcher, TokenKey, TokenStore};
    pub use lapidar_protocol::{BotConfig, CommandDescriptor, WebInterface};
    pub use lapidar_session::{
        AuthBackend, Authenticated, CredentialEntry, CredentialsOutcome, LoginError, LoginState,
        LoginStep, SecondFactorEntry, SecondFactorOutcome,
    };
    pub use lapidar_transport::{HttpTransport, HttpTransportConfig, Transport};
}
