//! Command Dispatcher: validates an abstract command against a resource's current
//! descriptors and forwards it to the provider.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::directory::ResourceDirectory;
use crate::domain::AdapterError;
use crate::provider::{CommandOutcome, ProviderError, ResourceProvider};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub enum ResourceCommand {
    Start,
    Stop,
    Restart,
}

impl ResourceCommand {
    pub const ALL: [ResourceCommand; 3] = [Self::Start, Self::Stop, Self::Restart];

    /// Name of the descriptor a resource exposes for this command.
    pub fn concrete_name(self) -> &'static str {
        match self {
            Self::Start => "resource-start",
            Self::Stop => "resource-stop",
            Self::Restart => "resource-restart",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "Start",
            Self::Stop => "Stop",
            Self::Restart => "Restart",
        }
    }
}

impl fmt::Display for ResourceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceCommand {
    type Err = AdapterError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|command| command.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| AdapterError::InvalidCommand(value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReport {
    pub resource_id: String,
    pub command: ResourceCommand,
    pub outcome: CommandOutcome,
}

impl fmt::Display for CommandReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            resource_id,
            command,
            outcome,
        } = self;

        match outcome {
            CommandOutcome::Succeeded => {
                write!(f, "Successfully executed {command} on resource '{resource_id}'.")
            }
            CommandOutcome::Cancelled => {
                write!(f, "Command {command} was cancelled for resource '{resource_id}'.")
            }
            CommandOutcome::Failed(message) => write!(
                f,
                "Failed to execute {command} on resource '{resource_id}': {}.",
                message.as_deref().unwrap_or("Unknown error")
            ),
        }
    }
}

pub struct CommandDispatcher<'a> {
    provider: &'a dyn ResourceProvider,
}

impl<'a> CommandDispatcher<'a> {
    pub fn new(provider: &'a dyn ResourceProvider) -> Self {
        Self { provider }
    }

    /// Resolves the resource first, so an unknown resource is reported before an unknown
    /// command.
    pub async fn execute(
        &self,
        resource_id: &str,
        command: &str,
        cancel: &CancellationToken,
    ) -> Result<CommandReport, AdapterError> {
        let execution_error = |source: ProviderError| AdapterError::Execution {
            resource: resource_id.to_string(),
            source,
        };

        let snapshot = ResourceDirectory::new(self.provider)
            .snapshot(cancel)
            .await
            .map_err(execution_error)?;

        let resource = snapshot
            .find(resource_id)
            .ok_or_else(|| AdapterError::ResourceNotFound(resource_id.to_string()))?;

        let command: ResourceCommand = command.parse()?;

        let descriptor = resource.command(command.concrete_name()).ok_or_else(|| {
            AdapterError::CommandNotAvailable {
                resource: resource_id.to_string(),
                command: command.to_string(),
            }
        })?;

        if !descriptor.is_enabled() {
            debug!(
                resource = %resource_id,
                command = %command,
                state = %resource.state,
                "command rejected in current state"
            );
            return Err(AdapterError::CommandNotEnabled {
                resource: resource_id.to_string(),
                command: command.to_string(),
                state: resource.state.clone(),
            });
        }

        let outcome = self
            .provider
            .execute_command(resource_id, &resource.resource_type, descriptor, cancel)
            .await
            .map_err(execution_error)?;

        info!(
            resource = %resource_id,
            command = %command,
            outcome = ?outcome,
            "resource command dispatched"
        );

        Ok(CommandReport {
            resource_id: resource_id.to_string(),
            command,
            outcome,
        })
    }
}
