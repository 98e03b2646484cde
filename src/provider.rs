//! Boundary with the external resource-monitoring collaborator
//!
//! The adapter only ever sees point-in-time values from a `ResourceProvider`; nothing
//! here is cached across requests.

use std::pin::Pin;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;

pub const STATE_RUNNING: &str = "Running";
pub const STATE_STARTING: &str = "Starting";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum CommandState {
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub name: String,
    pub state: CommandState,
}

impl CommandDescriptor {
    pub fn new(name: impl Into<String>, state: CommandState) -> Self {
        Self {
            name: name.into(),
            state,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.state == CommandState::Enabled
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Resource {
    pub name: String,
    pub display_name: String,
    pub resource_type: String,
    pub state: String,
    pub commands: Vec<CommandDescriptor>,
}

impl Resource {
    /// Advisory only: a running resource may still have produced no output.
    pub fn can_retrieve_logs(&self) -> bool {
        self.state == STATE_RUNNING || self.state == STATE_STARTING
    }

    pub fn command(&self, name: &str) -> Option<&CommandDescriptor> {
        self.commands.iter().find(|command| command.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub sequence_number: u64,
    pub content: String,
    pub is_error: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum CommandOutcome {
    Succeeded,
    Cancelled,
    Failed(Option<String>),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{0}")]
    Backend(String),
    #[error("operation was cancelled")]
    Cancelled,
}

impl ProviderError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// Live log batches for one resource. Ends when the source closes it.
pub type LogSubscription =
    Pin<Box<dyn Stream<Item = Result<Vec<LogLine>, ProviderError>> + Send + 'static>>;

#[async_trait]
pub trait ResourceProvider: Send + Sync {
    fn is_available(&self) -> bool;

    async fn list_resources(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<Resource>, ProviderError>;

    /// The subscription must stop producing once `cancel` fires.
    fn subscribe_logs(&self, resource_name: &str, cancel: CancellationToken) -> LogSubscription;

    async fn execute_command(
        &self,
        resource_id: &str,
        resource_type: &str,
        command: &CommandDescriptor,
        cancel: &CancellationToken,
    ) -> Result<CommandOutcome, ProviderError>;
}

#[cfg(test)]
pub(crate) mod mock;
