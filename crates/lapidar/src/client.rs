//! `ConsoleClient`: the data operations behind every console page.
//!
//! Each method is one backend call through the shared [`Dispatcher`], so
//! every call gets the anti-forgery token, the bearer credential, and
//! error normalization without doing anything itself.

use lapidar_dispatch::{Dispatcher, TokenStore};
use lapidar_protocol::{
    BotConfig, BotStats, CommandDescriptor, LoginLogEntry, StatusResponse, UpdateCommandRequest,
    paths,
};
use lapidar_session::LoginState;
use lapidar_transport::{HttpTransport, HttpTransportConfig, Transport};

use crate::LapidarError;

/// Typed access to the bot backend.
///
/// Cloning is cheap and every clone shares the same token store.
pub struct ConsoleClient<T> {
    dispatcher: Dispatcher<T>,
}

impl ConsoleClient<HttpTransport> {
    /// Connects to the API root (typically the front door's
    /// `http://localhost:3000/api`).
    pub fn connect(config: HttpTransportConfig, store: TokenStore) -> Result<Self, LapidarError> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::new(Dispatcher::new(transport, store)))
    }
}

impl<T: Transport> ConsoleClient<T> {
    pub fn new(dispatcher: Dispatcher<T>) -> Self {
        Self { dispatcher }
    }

    /// The dispatcher, which is also the [`AuthBackend`](lapidar_session::AuthBackend)
    /// the login flow runs against.
    pub fn dispatcher(&self) -> &Dispatcher<T> {
        &self.dispatcher
    }

    pub fn store(&self) -> &TokenStore {
        self.dispatcher.store()
    }

    /// Where the login flow should start given the stored credential.
    pub fn login_state(&self) -> LoginState {
        LoginState::resume(self.store())
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    pub async fn get_config(&self) -> Result<BotConfig, LapidarError> {
        Ok(self.dispatcher.get_json(paths::CONFIG).await?)
    }

    /// Validates the port section, then saves the whole configuration.
    ///
    /// # Errors
    /// - [`LapidarError::Validation`]: bad ports; nothing was sent
    /// - [`LapidarError::Dispatch`]: the call failed
    /// - [`LapidarError::NotAcknowledged`]: the backend answered without
    ///   confirming the write
    pub async fn save_config(&self, config: &BotConfig) -> Result<(), LapidarError> {
        config.web_interface.validate()?;
        let ack: StatusResponse = self.dispatcher.post_json(paths::SAVE_CONFIG, config).await?;
        acknowledged(ack, "save-config")
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    pub async fn list_commands(&self) -> Result<Vec<CommandDescriptor>, LapidarError> {
        Ok(self.dispatcher.get_json(paths::COMMANDS).await?)
    }

    /// Enables or disables one command.
    pub async fn update_command(&self, name: &str, enabled: bool) -> Result<(), LapidarError> {
        let body = UpdateCommandRequest {
            name: name.to_string(),
            enabled,
        };
        let ack: StatusResponse = self
            .dispatcher
            .post_json(paths::UPDATE_COMMAND, &body)
            .await?;
        acknowledged(ack, "update-command")
    }

    // -----------------------------------------------------------------------
    // Dashboards
    // -----------------------------------------------------------------------

    pub async fn get_stats(&self) -> Result<BotStats, LapidarError> {
        Ok(self.dispatcher.get_json(paths::STATS).await?)
    }

    /// Recent login attempts, newest first as the backend returns them.
    pub async fn login_logs(&self) -> Result<Vec<LoginLogEntry>, LapidarError> {
        Ok(self.dispatcher.get_json(paths::LOGIN_LOGS).await?)
    }
}

impl<T> Clone for ConsoleClient<T> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<T> std::fmt::Debug for ConsoleClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleClient")
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

fn acknowledged(ack: StatusResponse, operation: &str) -> Result<(), LapidarError> {
    if ack.is_success() {
        return Ok(());
    }
    let message = ack
        .message()
        .map(str::to_string)
        .or_else(|| ack.status.clone())
        .unwrap_or_else(|| "no status in response".to_string());
    tracing::warn!(%operation, %message, "write not acknowledged");
    Err(LapidarError::NotAcknowledged { message })
}
