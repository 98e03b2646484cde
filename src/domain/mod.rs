//! Resource observability and command dispatch, plus the MCP tools and resources built on it
//!
//! Every failure the core can hit is an `AdapterError` whose `Display` is the text handed back
//! to the caller; the facade never lets one escape as an error.

use thiserror::Error;

use crate::provider::ProviderError;

pub mod aggregate;
pub mod commands;
pub mod directory;
pub mod facade;
pub mod logs;
pub mod resources;
pub mod tools;
pub mod utils;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("MCP server data provider is not available. Ensure the server is configured with a resource provider.")]
    Unavailable,
    #[error("{0} is required.")]
    MissingIdentifier(&'static str),
    #[error("Invalid command '{0}'. Valid commands are: Start, Stop, Restart.")]
    InvalidCommand(String),
    #[error("Resource '{0}' not found.")]
    ResourceNotFound(String),
    #[error("Command '{command}' is not available for resource '{resource}'.")]
    CommandNotAvailable { resource: String, command: String },
    #[error("Command '{command}' is not enabled for resource '{resource}' in its current state ({state}).")]
    CommandNotEnabled {
        resource: String,
        command: String,
        state: String,
    },
    #[error("Error listing resources: {0}")]
    Listing(#[source] ProviderError),
    #[error("Error fetching logs for resource '{resource}': {source}")]
    LogFetch {
        resource: String,
        #[source]
        source: ProviderError,
    },
    #[error("Error executing command for resource '{resource}': {source}")]
    Execution {
        resource: String,
        #[source]
        source: ProviderError,
    },
}

impl AdapterError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unavailable => "adapter_unavailable",
            Self::MissingIdentifier(_) | Self::InvalidCommand(_) => "invalid_input",
            Self::ResourceNotFound(_) | Self::CommandNotAvailable { .. } => "not_found",
            Self::CommandNotEnabled { .. } => "invalid_state",
            Self::Listing(_) | Self::LogFetch { .. } | Self::Execution { .. } => {
                "execution_failure"
            }
        }
    }
}
