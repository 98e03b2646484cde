//! Resource Directory: a fresh, read-only snapshot of the provider's resources per call

use std::collections::HashSet;
use std::fmt::Write as _;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::domain::commands::ResourceCommand;
use crate::domain::AdapterError;
use crate::provider::{Resource, ResourceProvider};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySnapshot {
    resources: Vec<Resource>,
}

impl DirectorySnapshot {
    /// Keeps the first resource for each name; later duplicates are dropped.
    pub fn new(resources: Vec<Resource>) -> Self {
        let mut seen = HashSet::new();
        let resources = resources
            .into_iter()
            .filter(|resource| {
                let fresh = seen.insert(resource.name.clone());
                if !fresh {
                    warn!(resource = %resource.name, "duplicate resource name in snapshot");
                }
                fresh
            })
            .collect();

        Self { resources }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    pub fn find(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|resource| resource.name == name)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn render(&self) -> String {
        let mut text = String::from("=== Available Resources ===\n\n");

        if self.is_empty() {
            text.push_str("No resources found.");
            return text;
        }

        for resource in self.iter() {
            let _ = writeln!(text, "- {}", resource.name);
            let _ = writeln!(text, "  Display Name: {}", resource.display_name);
            let _ = writeln!(text, "  Type: {}", resource.resource_type);
            let _ = writeln!(text, "  State: {}", resource.state);
            let _ = writeln!(
                text,
                "  Can retrieve logs: {}",
                if resource.can_retrieve_logs() { "Yes" } else { "No" }
            );
            let _ = writeln!(
                text,
                "  Available commands: {}\n",
                enabled_commands(resource)
            );
        }

        text.push_str(
            "Use get_resource_logs with a resource name to retrieve logs for a specific resource.",
        );
        text
    }
}

fn enabled_commands(resource: &Resource) -> String {
    let enabled = ResourceCommand::ALL
        .iter()
        .filter(|command| {
            resource
                .command(command.concrete_name())
                .is_some_and(|descriptor| descriptor.is_enabled())
        })
        .map(ResourceCommand::to_string)
        .collect::<Vec<_>>();

    if enabled.is_empty() {
        "none".to_string()
    } else {
        enabled.join(", ")
    }
}

pub struct ResourceDirectory<'a> {
    provider: &'a dyn ResourceProvider,
}

impl<'a> ResourceDirectory<'a> {
    pub fn new(provider: &'a dyn ResourceProvider) -> Self {
        Self { provider }
    }

    /// Re-queries the provider on every call.
    pub async fn snapshot(
        &self,
        cancel: &CancellationToken,
    ) -> Result<DirectorySnapshot, crate::provider::ProviderError> {
        let resources = self.provider.list_resources(cancel).await?;
        Ok(DirectorySnapshot::new(resources))
    }

    pub async fn list(&self, cancel: &CancellationToken) -> Result<String, AdapterError> {
        let snapshot = self.snapshot(cancel).await.map_err(AdapterError::Listing)?;
        Ok(snapshot.render())
    }
}
