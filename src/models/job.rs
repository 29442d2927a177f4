//! Fixed job types: scheduled commands dispatched to one or more sensors.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Commands that refuse to run without arguments
const COMMANDS_REQUIRING_ARGUMENTS: &[&str] = &[
    "iridium_sniffing",
    "get_logs",
    "set_network_conn",
    "set_wifi_config",
    "set_eth_config",
    "get_sys_config",
    "set_sys_config",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Finished,
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Finished => write!(f, "finished"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A scheduled job as the backend reports it.
/// `id` is the authoritative key; `name` is display-only and not guaranteed
/// unique across deletions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedJob {
    pub id: String,
    pub name: String,
    pub start_time: i64,
    pub end_time: i64,
    pub command: String,
    #[serde(default)]
    pub arguments: BTreeMap<String, String>,
    #[serde(default)]
    pub sensors: Vec<String>,
    #[serde(default)]
    pub states: BTreeMap<String, String>,
    pub status: JobStatus,
}

impl FixedJob {
    /// Sort jobs for display: most recent start first, so the table leads
    /// with what is running or coming up next
    pub fn sort_for_display(jobs: &mut [FixedJob]) {
        jobs.sort_by(|a, b| b.start_time.cmp(&a.start_time));
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum JobValidationError {
    #[error("Job name must not be empty")]
    EmptyName,

    #[error("Job name must not contain whitespace")]
    WhitespaceInName,

    #[error("The job's end must be after its start time")]
    EndBeforeStart,

    #[error("The command '{0}' requires arguments")]
    MissingArguments(String),

    #[error("No command given")]
    EmptyCommand,
}

/// Creation payload for POST /fixedjobs/.
///
/// Arguments are a structured key/value map built directly from caller
/// input; there is no free-text "key:value" string to coerce.
#[derive(Debug, Clone, Serialize)]
pub struct NewFixedJob {
    pub name: String,
    pub start_time: i64,
    pub end_time: i64,
    pub command: String,
    pub arguments: BTreeMap<String, String>,
    pub sensors: Vec<String>,
    pub states: BTreeMap<String, String>,
}

impl NewFixedJob {
    pub fn new(name: &str, start_time: i64, end_time: i64, command: &str) -> Self {
        Self {
            name: name.to_string(),
            start_time,
            end_time,
            command: command.to_string(),
            arguments: BTreeMap::new(),
            sensors: Vec::new(),
            states: BTreeMap::new(),
        }
    }

    pub fn with_argument(mut self, key: &str, value: &str) -> Self {
        self.arguments.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_sensors(mut self, sensors: Vec<String>) -> Self {
        self.sensors = sensors;
        self
    }

    /// The same checks the old creation dialog ran before submitting
    pub fn validate(&self) -> Result<(), JobValidationError> {
        if self.name.is_empty() {
            return Err(JobValidationError::EmptyName);
        }
        if self.name.contains(char::is_whitespace) {
            return Err(JobValidationError::WhitespaceInName);
        }
        if self.command.is_empty() {
            return Err(JobValidationError::EmptyCommand);
        }
        if self.end_time <= self.start_time {
            return Err(JobValidationError::EndBeforeStart);
        }
        if COMMANDS_REQUIRING_ARGUMENTS.contains(&self.command.as_str())
            && self.arguments.is_empty()
        {
            return Err(JobValidationError::MissingArguments(self.command.clone()));
        }
        Ok(())
    }
}
