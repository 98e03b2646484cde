//! Query Facade: the three text-returning entry points handed to MCP tools and resources
//!
//! Checks availability and input, delegates, and turns every `AdapterError` into its text.

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::domain::commands::CommandDispatcher;
use crate::domain::directory::ResourceDirectory;
use crate::domain::logs::{AggregationLimits, LogAggregator};
use crate::domain::utils::normalize_identifier;
use crate::domain::AdapterError;
use crate::provider::{CommandOutcome, ResourceProvider};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CommandResponse {
    pub text: String,
    /// Present only when the provider actually ran the command.
    pub outcome: Option<CommandOutcome>,
}

#[derive(Clone)]
pub struct QueryFacade {
    provider: Option<Arc<dyn ResourceProvider>>,
    limits: AggregationLimits,
}

impl QueryFacade {
    pub fn new(provider: Option<Arc<dyn ResourceProvider>>, limits: AggregationLimits) -> Self {
        Self { provider, limits }
    }

    pub fn is_available(&self) -> bool {
        self.provider
            .as_deref()
            .is_some_and(|provider| provider.is_available())
    }

    fn provider(&self) -> Result<&dyn ResourceProvider, AdapterError> {
        self.provider
            .as_deref()
            .filter(|provider| provider.is_available())
            .ok_or(AdapterError::Unavailable)
    }

    pub async fn list_resources(&self, cancel: &CancellationToken) -> String {
        let result = match self.provider() {
            Ok(provider) => ResourceDirectory::new(provider).list(cancel).await,
            Err(err) => Err(err),
        };

        into_text(result)
    }

    pub async fn get_logs(&self, resource_name: &str, cancel: &CancellationToken) -> String {
        let result = async {
            let provider = self.provider()?;
            let resource_name = normalize_identifier(resource_name, "Resource name")?;
            LogAggregator::new(provider, self.limits)
                .collect(resource_name, cancel)
                .await
                .map(|snapshot| snapshot.render())
        }
        .await;

        into_text(result)
    }

    pub async fn execute_command(
        &self,
        resource_id: &str,
        command: &str,
        cancel: &CancellationToken,
    ) -> CommandResponse {
        let result = async {
            let provider = self.provider()?;
            let resource_id = normalize_identifier(resource_id, "Resource ID")?;
            CommandDispatcher::new(provider)
                .execute(resource_id, command, cancel)
                .await
        }
        .await;

        match result {
            Ok(report) => CommandResponse {
                text: report.to_string(),
                outcome: Some(report.outcome),
            },
            Err(err) => CommandResponse {
                text: into_text(Err(err)),
                outcome: None,
            },
        }
    }
}

fn into_text(result: Result<String, AdapterError>) -> String {
    result.unwrap_or_else(|err| {
        warn!(code = err.code(), error = %err, "adapter request not fulfilled");
        err.to_string()
    })
}

#[cfg(test)]
mod tests {
    use crate::provider::mock::{log_lines, resource, LogScript, MockProvider};
    use crate::provider::CommandState::Enabled;

    use super::*;

    const UNAVAILABLE: &str = "MCP server data provider is not available. Ensure the server is configured with a resource provider.";

    fn facade(provider: MockProvider) -> QueryFacade {
        let provider: Arc<dyn ResourceProvider> = Arc::new(provider);
        QueryFacade::new(Some(provider), AggregationLimits::default())
    }

    #[tokio::test]
    async fn missing_provider_is_unavailable_everywhere() {
        let facade = QueryFacade::new(None, AggregationLimits::default());
        let cancel = CancellationToken::new();

        assert!(!facade.is_available());
        assert_eq!(facade.list_resources(&cancel).await, UNAVAILABLE);
        assert_eq!(facade.get_logs("api", &cancel).await, UNAVAILABLE);

        let response = facade.execute_command("api", "Start", &cancel).await;
        assert_eq!(response.text, UNAVAILABLE);
        assert_eq!(response.outcome, None);
    }

    #[tokio::test]
    async fn disabled_provider_is_unavailable() {
        let facade = facade(MockProvider {
            available: false,
            ..MockProvider::default()
        });

        assert_eq!(
            facade.list_resources(&CancellationToken::new()).await,
            UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn empty_identifiers_are_rejected() {
        let facade = facade(MockProvider::default());
        let cancel = CancellationToken::new();

        assert_eq!(facade.get_logs("  ", &cancel).await, "Resource name is required.");
        assert_eq!(
            facade.execute_command("", "Start", &cancel).await.text,
            "Resource ID is required."
        );
    }

    #[tokio::test]
    async fn executes_command_and_reports_outcome() {
        let facade = facade(MockProvider::with_resources(vec![
            resource("frontend", "Running", &[("resource-start", Enabled)]),
            resource("backend", "Running", &[]),
        ]));

        let response = facade
            .execute_command("frontend", "Start", &CancellationToken::new())
            .await;

        assert_eq!(response.text, "Successfully executed Start on resource 'frontend'.");
        assert_eq!(response.outcome, Some(CommandOutcome::Succeeded));
    }

    #[tokio::test]
    async fn get_logs_trims_the_resource_name() {
        let facade = facade(
            MockProvider::default().with_logs("svc", LogScript::Closing(vec![log_lines(1..=1)])),
        );

        let text = facade.get_logs(" svc ", &CancellationToken::new()).await;

        assert_eq!(text, "[1] line 1");
    }
}
