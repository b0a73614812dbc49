//! Wire protocol for the Lapidar console.
//!
//! This crate defines the "language" the console and the bot backend
//! speak:
//!
//! - **Types** ([`LoginRequest`], [`LoginResponse`], [`BotConfig`], ...):
//!   the bodies that travel on the wire, plus the API [`paths`].
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those bodies are
//!   converted to/from bytes.
//! - **Validation** ([`WebInterface::add_alt_port`], [`validate_ports`]):
//!   the port rules checked before a configuration is ever sent.
//! - **Errors** ([`ProtocolError`], [`ValidationError`]).
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw HTTP) and the
//! dispatcher (typed calls). It doesn't know about connections or
//! sessions; it only knows shapes.
//!
//! ```text
//! Transport (HttpRequest) → Protocol (typed bodies) → Dispatcher / Session
//! ```

mod codec;
mod error;
mod settings;
mod types;

pub use codec::Codec;
pub use codec::JsonCodec;
pub use error::{ProtocolError, ValidationError};
pub use settings::{
    BotConfig, DEFAULT_ALT_PORTS, DEFAULT_HOST, DEFAULT_PRIMARY_PORT,
    WebInterface, parse_port, parse_port_list, validate_ports,
};
pub use types::{
    BotStats, CSRF_HEADER, CommandDescriptor, LoginLogEntry, LoginRequest,
    LoginResponse, StatusResponse, TotpRequest, UpdateCommandRequest, paths,
};
