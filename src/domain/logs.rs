//! Log Aggregator: a bounded, formatted snapshot of a resource's live console output

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::aggregate::{take_until, StopReason};
use crate::domain::AdapterError;
use crate::provider::{LogLine, ResourceProvider};

pub const DEFAULT_MAX_LINES: usize = 100;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationLimits {
    pub max_lines: usize,
    pub timeout: Duration,
}

impl Default for AggregationLimits {
    fn default() -> Self {
        Self {
            max_lines: DEFAULT_MAX_LINES,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSnapshot {
    pub resource_name: String,
    pub lines: Vec<String>,
    pub stop: StopReason,
    pub max_lines: usize,
}

impl LogSnapshot {
    pub fn render(&self) -> String {
        let name = &self.resource_name;
        match self.stop {
            StopReason::Limit => {
                let mut text = self.lines.join("\n");
                text.push_str(&format!(
                    "\n\n... (showing first {} lines)",
                    self.max_lines
                ));
                text
            }
            StopReason::Closed if self.lines.is_empty() => format!(
                "No console logs available for resource: {name}\n\
                 (The resource may not exist, may not be running, or may not have produced any output yet)"
            ),
            StopReason::Deadline | StopReason::Cancelled if self.lines.is_empty() => {
                format!("No logs received for resource: {name}")
            }
            // Hitting the deadline with some lines reads the same as a closed stream.
            StopReason::Closed | StopReason::Deadline | StopReason::Cancelled => {
                self.lines.join("\n")
            }
        }
    }
}

pub fn format_log_line(line: &LogLine) -> String {
    if line.is_error {
        format!("[{}] ERROR: {}", line.sequence_number, line.content)
    } else {
        format!("[{}] {}", line.sequence_number, line.content)
    }
}

pub struct LogAggregator<'a> {
    provider: &'a dyn ResourceProvider,
    limits: AggregationLimits,
}

impl<'a> LogAggregator<'a> {
    pub fn new(provider: &'a dyn ResourceProvider, limits: AggregationLimits) -> Self {
        Self { provider, limits }
    }

    pub async fn collect(
        &self,
        resource_name: &str,
        cancel: &CancellationToken,
    ) -> Result<LogSnapshot, AdapterError> {
        // The subscription is cancelled when this call returns, however it returns.
        let linked = cancel.child_token();
        let _subscription_guard = linked.clone().drop_guard();

        let deadline = Instant::now() + self.limits.timeout;
        let mut subscription = self.provider.subscribe_logs(resource_name, linked.clone());

        let bounded = take_until(&mut subscription, self.limits.max_lines, deadline, &linked)
            .await
            .map_err(|source| AdapterError::LogFetch {
                resource: resource_name.to_string(),
                source,
            })?;

        debug!(
            resource = %resource_name,
            lines = bounded.items.len(),
            stop = ?bounded.stop,
            "log aggregation finished"
        );

        Ok(LogSnapshot {
            resource_name: resource_name.to_string(),
            lines: bounded.items.iter().map(format_log_line).collect(),
            stop: bounded.stop,
            max_lines: self.limits.max_lines,
        })
    }
}
