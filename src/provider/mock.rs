//! In-memory `ResourceProvider` for tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

use super::{
    CommandDescriptor, CommandOutcome, CommandState, LogLine, LogSubscription, ProviderError,
    Resource, ResourceProvider,
};

#[derive(Debug, Clone)]
pub enum LogScript {
    /// Emits the batches, then the stream closes.
    Closing(Vec<Vec<LogLine>>),
    /// Emits the batches, then never yields again.
    Hanging(Vec<Vec<LogLine>>),
    Failing(String),
}

pub struct MockProvider {
    pub available: bool,
    pub resources: Mutex<Vec<Resource>>,
    pub logs: HashMap<String, LogScript>,
    pub outcome: CommandOutcome,
    pub listing_error: Option<String>,
    pub execution_error: Option<String>,
    pub calls: Mutex<Vec<(String, String)>>,
    pub listings: AtomicUsize,
    pub subscriptions: Mutex<Vec<CancellationToken>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            available: true,
            resources: Mutex::new(Vec::new()),
            logs: HashMap::new(),
            outcome: CommandOutcome::Succeeded,
            listing_error: None,
            execution_error: None,
            calls: Mutex::new(Vec::new()),
            listings: AtomicUsize::new(0),
            subscriptions: Mutex::new(Vec::new()),
        }
    }
}

impl MockProvider {
    pub fn with_resources(resources: Vec<Resource>) -> Self {
        Self {
            resources: Mutex::new(resources),
            ..Self::default()
        }
    }

    pub fn with_logs(mut self, resource_name: &str, script: LogScript) -> Self {
        self.logs.insert(resource_name.to_string(), script);
        self
    }

    pub fn replace_resources(&self, resources: Vec<Resource>) {
        *self.resources.lock().expect("resources lock") = resources;
    }

    pub fn listing_count(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }

    /// Tokens handed to `subscribe_logs`, in call order.
    pub fn subscription_tokens(&self) -> Vec<CancellationToken> {
        self.subscriptions.lock().expect("subscriptions lock").clone()
    }

    /// `(resource_id, concrete command name)` pairs handed to `execute_command`.
    pub fn executed(&self) -> Vec<(String, String)> {
        self.calls.lock().expect("executed lock").clone()
    }
}

pub fn resource(name: &str, state: &str, commands: &[(&str, CommandState)]) -> Resource {
    Resource {
        name: name.to_string(),
        display_name: format!("{name}-display"),
        resource_type: "Project".to_string(),
        state: state.to_string(),
        commands: commands
            .iter()
            .map(|(command, state)| CommandDescriptor::new(*command, *state))
            .collect(),
    }
}

pub fn log_lines(range: std::ops::RangeInclusive<u64>) -> Vec<LogLine> {
    range
        .map(|sequence_number| LogLine {
            sequence_number,
            content: format!("line {sequence_number}"),
            is_error: false,
        })
        .collect()
}

#[async_trait]
impl ResourceProvider for MockProvider {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn list_resources(
        &self,
        _cancel: &CancellationToken,
    ) -> Result<Vec<Resource>, ProviderError> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        match &self.listing_error {
            Some(message) => Err(ProviderError::backend(message.clone())),
            None => Ok(self.resources.lock().expect("resources lock").clone()),
        }
    }

    fn subscribe_logs(&self, resource_name: &str, cancel: CancellationToken) -> LogSubscription {
        self.subscriptions
            .lock()
            .expect("subscriptions lock")
            .push(cancel);
        match self.logs.get(resource_name).cloned() {
            Some(LogScript::Closing(batches)) => {
                Box::pin(tokio_stream::iter(batches.into_iter().map(Ok)))
            }
            Some(LogScript::Hanging(batches)) => Box::pin(
                tokio_stream::iter(batches.into_iter().map(Ok)).chain(tokio_stream::pending()),
            ),
            Some(LogScript::Failing(message)) => Box::pin(tokio_stream::iter(vec![Err(
                ProviderError::backend(message),
            )])),
            None => Box::pin(tokio_stream::empty()),
        }
    }

    async fn execute_command(
        &self,
        resource_id: &str,
        _resource_type: &str,
        command: &CommandDescriptor,
        _cancel: &CancellationToken,
    ) -> Result<CommandOutcome, ProviderError> {
        self.calls
            .lock()
            .expect("executed lock")
            .push((resource_id.to_string(), command.name.clone()));

        match &self.execution_error {
            Some(message) => Err(ProviderError::backend(message.clone())),
            None => Ok(self.outcome.clone()),
        }
    }
}
