//! `ResourceProvider` backed by systemd
//!
//! Service units are the resources. Listing and commands go over the system D-Bus; console
//! logs are followed from journald on a blocking thread.

use std::{collections::BTreeMap, path::Path, time::Duration};

use async_trait::async_trait;
use systemd::journal;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use zbus::{zvariant::OwnedObjectPath, Connection, Proxy};

use crate::domain::commands::ResourceCommand;
use crate::provider::{
    CommandDescriptor, CommandOutcome, CommandState, LogLine, LogSubscription, ProviderError,
    Resource, ResourceProvider,
};

const SERVICE_RESOURCE_TYPE: &str = "Service";
const JOB_MODE: &str = "replace";
const LOG_BATCH_SIZE: usize = 64;
const JOURNAL_WAIT: Duration = Duration::from_millis(250);
/// journald priorities up to `err` count as error output.
const MAX_ERROR_PRIORITY: u8 = 3;

#[derive(Debug, Clone)]
struct RawUnit {
    name: String,
    description: String,
    active_state: String,
}

type ListUnitRecord = (
    String,
    String,
    String,
    String,
    String,
    String,
    OwnedObjectPath,
    u32,
    String,
    OwnedObjectPath,
);

#[derive(Debug, Default)]
pub struct DbusSystemdClient;

impl DbusSystemdClient {
    pub fn new() -> Self {
        Self
    }

    async fn manager_proxy(&self) -> Result<Proxy<'static>, ProviderError> {
        let connection = Connection::system().await.map_err(|err| {
            ProviderError::backend(format!("failed to connect to system dbus: {err}"))
        })?;

        Proxy::new(
            &connection,
            "org.freedesktop.systemd1",
            "/org/freedesktop/systemd1",
            "org.freedesktop.systemd1.Manager",
        )
        .await
        .map_err(|err| ProviderError::backend(format!("failed to create systemd dbus proxy: {err}")))
    }
}

#[async_trait]
impl ResourceProvider for DbusSystemdClient {
    fn is_available(&self) -> bool {
        Path::new("/run/systemd/system").exists()
    }

    async fn list_resources(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<Resource>, ProviderError> {
        let listing = async {
            let proxy = self.manager_proxy().await?;
            let rows: Vec<ListUnitRecord> = proxy.call("ListUnits", &()).await.map_err(|err| {
                ProviderError::backend(format!("failed to list units from systemd: {err}"))
            })?;
            Ok::<_, ProviderError>(rows)
        };

        let rows = tokio::select! {
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
            rows = listing => rows?,
        };

        let raw_units = rows
            .into_iter()
            .map(
                |(
                    name,
                    description,
                    _load_state,
                    active_state,
                    _sub_state,
                    _following,
                    _unit_path,
                    _job_id,
                    _job_type,
                    _job_path,
                )| RawUnit {
                    name,
                    description,
                    active_state,
                },
            )
            .collect();

        Ok(map_and_sort_service_units(raw_units))
    }

    fn subscribe_logs(&self, resource_name: &str, cancel: CancellationToken) -> LogSubscription {
        let (sender, receiver) = mpsc::channel(16);
        let unit = resource_name.to_string();

        tokio::task::spawn_blocking(move || {
            if let Err(err) = follow_journal(&unit, &sender, &cancel) {
                warn!(unit = %unit, error = %err, "journal subscription failed");
                let _ = sender.blocking_send(Err(ProviderError::backend(err.to_string())));
            }
        });

        Box::pin(ReceiverStream::new(receiver))
    }

    /// Cancellation is honoured only until the job request is sent. Once systemd has it the
    /// job may already be queued, so the reply decides the outcome.
    async fn execute_command(
        &self,
        resource_id: &str,
        _resource_type: &str,
        command: &CommandDescriptor,
        cancel: &CancellationToken,
    ) -> Result<CommandOutcome, ProviderError> {
        let Some(method) = manager_method(&command.name) else {
            return Ok(CommandOutcome::Failed(Some(format!(
                "unsupported command '{}'",
                command.name
            ))));
        };

        let proxy = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(CommandOutcome::Cancelled),
            proxy = self.manager_proxy() => proxy?,
        };
        let result: zbus::Result<OwnedObjectPath> =
            proxy.call(method, &(resource_id, JOB_MODE)).await;

        match result {
            Ok(job) => {
                debug!(unit = %resource_id, method, job = %job.as_str(), "systemd job queued");
                Ok(CommandOutcome::Succeeded)
            }
            Err(zbus::Error::MethodError(name, detail, _)) => Ok(CommandOutcome::Failed(Some(
                detail.unwrap_or_else(|| name.to_string()),
            ))),
            Err(err) => Err(ProviderError::backend(format!(
                "systemd {method} call failed: {err}"
            ))),
        }
    }
}

fn manager_method(concrete_name: &str) -> Option<&'static str> {
    let command = ResourceCommand::ALL
        .into_iter()
        .find(|command| command.concrete_name() == concrete_name)?;

    Some(match command {
        ResourceCommand::Start => "StartUnit",
        ResourceCommand::Stop => "StopUnit",
        ResourceCommand::Restart => "RestartUnit",
    })
}

fn map_and_sort_service_units(raw_units: Vec<RawUnit>) -> Vec<Resource> {
    let mut units: Vec<Resource> = raw_units
        .into_iter()
        .filter(|unit| unit.name.ends_with(".service"))
        .map(|unit| {
            let state = resource_state(&unit.active_state);
            Resource {
                display_name: if unit.description.trim().is_empty() {
                    unit.name.clone()
                } else {
                    unit.description
                },
                name: unit.name,
                resource_type: SERVICE_RESOURCE_TYPE.to_string(),
                commands: commands_for_state(&state),
                state,
            }
        })
        .collect();

    units.sort_by(|left, right| left.name.cmp(&right.name));
    units
}

fn resource_state(active_state: &str) -> String {
    match active_state {
        "active" | "reloading" => "Running",
        "activating" => "Starting",
        "deactivating" => "Stopping",
        "inactive" => "Stopped",
        "failed" => "Failed",
        other => other,
    }
    .to_string()
}

fn commands_for_state(state: &str) -> Vec<CommandDescriptor> {
    let enabled = |command: ResourceCommand| match state {
        "Running" => command != ResourceCommand::Start,
        "Starting" => command == ResourceCommand::Stop,
        "Stopping" => false,
        _ => command == ResourceCommand::Start,
    };

    ResourceCommand::ALL
        .into_iter()
        .map(|command| {
            let state = if enabled(command) {
                CommandState::Enabled
            } else {
                CommandState::Disabled
            };
            CommandDescriptor::new(command.concrete_name(), state)
        })
        .collect()
}

fn to_log_line(sequence_number: u64, record: &BTreeMap<String, String>) -> LogLine {
    let is_error = record
        .get("PRIORITY")
        .and_then(|priority| priority.parse::<u8>().ok())
        .is_some_and(|priority| priority <= MAX_ERROR_PRIORITY);

    LogLine {
        sequence_number,
        content: record.get("MESSAGE").cloned().unwrap_or_default(),
        is_error,
    }
}

/// Streams matching journal entries until cancelled or the receiver goes away.
fn follow_journal(
    unit: &str,
    sender: &mpsc::Sender<Result<Vec<LogLine>, ProviderError>>,
    cancel: &CancellationToken,
) -> std::io::Result<()> {
    let mut journal = journal::OpenOptions::default().system(true).open()?;
    journal.match_add("_SYSTEMD_UNIT", unit.to_string())?;
    journal.seek_head()?;

    let mut sequence_number = 0_u64;
    let mut batch = Vec::new();

    while !cancel.is_cancelled() && !sender.is_closed() {
        while let Some(record) = journal.next_entry()? {
            sequence_number += 1;
            batch.push(to_log_line(sequence_number, &record));
            if batch.len() >= LOG_BATCH_SIZE {
                break;
            }
        }

        if batch.is_empty() {
            journal.wait(Some(JOURNAL_WAIT))?;
            continue;
        }

        if sender.blocking_send(Ok(std::mem::take(&mut batch))).is_err() {
            break;
        }
    }

    debug!(unit = %unit, lines = sequence_number, "journal subscription closed");
    Ok(())
}
