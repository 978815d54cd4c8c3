// Training run record
//
// Validated hyperparameters plus the process bookkeeping filled in by the
// launcher. Everything derived from the record (liveness, log paths, detail
// URL) is computed on demand and never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::layout::LogLayout;
use super::routes::RouteResolver;
use super::supervisor::ProcessSupervisor;
use crate::errors::ValidationError;
use crate::identity::User;

pub const MAX_TITLE_LEN: usize = 255;
pub const MAX_COMMAND_LEN: usize = 1000;

/// Stored command line before anything was launched
pub const DEFAULT_COMMAND: &str = ".";

pub const MIN_LEARNING_RATE: f64 = 1e-20;
pub const MAX_LEARNING_RATE: f64 = 1.0;

/// Upper bound of a positive integer column
pub const MAX_POSITIVE_INT: i64 = i32::MAX as i64;

/// Primary key of a training run row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub i64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Optimizer the training script is asked to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Optimizer {
    Adam,
    Sgd,
}

impl Optimizer {
    pub const ALL: [Optimizer; 2] = [Optimizer::Adam, Optimizer::Sgd];

    pub fn as_str(&self) -> &'static str {
        match self {
            Optimizer::Adam => "adam",
            Optimizer::Sgd => "sgd",
        }
    }
}

impl FromStr for Optimizer {
    type Err = ValidationError;

    /// Exact, case-sensitive match against the stored spelling
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "adam" => Ok(Optimizer::Adam),
            "sgd" => Ok(Optimizer::Sgd),
            other => Err(ValidationError::InvalidOptimizer(other.to_string())),
        }
    }
}

impl fmt::Display for Optimizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Learning rate within [1e-20, 1]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct LearningRate(f64);

impl LearningRate {
    pub fn new(value: f64) -> Result<Self, ValidationError> {
        // NaN fails both comparisons
        if (MIN_LEARNING_RATE..=MAX_LEARNING_RATE).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ValidationError::LearningRateOutOfRange(value))
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for LearningRate {
    type Error = ValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LearningRate> for f64 {
    fn from(rate: LearningRate) -> Self {
        rate.0
    }
}

impl fmt::Display for LearningRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether the training process has been started
///
/// Storage keeps the legacy encoding: pid 0 (or NULL) means pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunPhase {
    Pending,
    Launched { pid: u32 },
}

impl RunPhase {
    pub fn from_stored_pid(pid: Option<u32>) -> Self {
        match pid {
            None | Some(0) => RunPhase::Pending,
            Some(pid) => RunPhase::Launched { pid },
        }
    }

    /// Value written to the `pid` column
    pub fn stored_pid(&self) -> u32 {
        match self {
            RunPhase::Pending => 0,
            RunPhase::Launched { pid } => *pid,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        match self {
            RunPhase::Pending => None,
            RunPhase::Launched { pid } => Some(*pid),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, RunPhase::Pending)
    }

    /// Move a pending run to launched. There is no way back.
    pub fn launch(self, pid: u32) -> Result<Self, Self> {
        match self {
            RunPhase::Pending if pid != 0 => Ok(RunPhase::Launched { pid }),
            other => Err(other),
        }
    }
}

/// Combined view of phase and liveness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Exited,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Exited => "exited",
        }
    }
}

/// Creation attributes exactly as submitted, before validation
///
/// Integers are signed so negative input reaches validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunForm {
    pub title: String,
    pub batch_size: i64,
    pub image_size: i64,
    pub n_validation: i64,
    pub n_test: i64,
    pub learning_rate: f64,
    pub optimizer: String,
    pub group_size: i64,
    pub filters_root: i64,
    pub augment: bool,
}

impl RunForm {
    /// Validate every field, reporting the first failure in declaration order
    pub fn validate(&self) -> Result<RunParams, ValidationError> {
        Ok(RunParams {
            title: validate_title(&self.title)?,
            batch_size: positive_int("batch_size", self.batch_size)?,
            image_size: positive_int("image_size", self.image_size)?,
            n_validation: positive_int("n_validation", self.n_validation)?,
            n_test: positive_int("n_test", self.n_test)?,
            learning_rate: LearningRate::new(self.learning_rate)?,
            optimizer: self.optimizer.parse()?,
            group_size: positive_int("group_size", self.group_size)?,
            filters_root: positive_int("filters_root", self.filters_root)?,
            augment: self.augment,
        })
    }
}

impl From<&RunParams> for RunForm {
    fn from(params: &RunParams) -> Self {
        Self {
            title: params.title.clone(),
            batch_size: params.batch_size.into(),
            image_size: params.image_size.into(),
            n_validation: params.n_validation.into(),
            n_test: params.n_test.into(),
            learning_rate: params.learning_rate.get(),
            optimizer: params.optimizer.as_str().to_string(),
            group_size: params.group_size.into(),
            filters_root: params.filters_root.into(),
            augment: params.augment,
        }
    }
}

/// Validated creation attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParams {
    pub title: String,
    pub batch_size: u32,
    pub image_size: u32,
    pub n_validation: u32,
    pub n_test: u32,
    pub learning_rate: LearningRate,
    pub optimizer: Optimizer,
    pub group_size: u32,
    pub filters_root: u32,
    pub augment: bool,
}

/// What the launcher reports back once it has started a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchRecord {
    pub pid: u32,
    pub tensorboard_pid: Option<u32>,
    pub port: Option<u16>,
    pub command: String,
}

impl LaunchRecord {
    pub fn new(pid: u32, command: impl Into<String>) -> Self {
        Self {
            pid,
            tensorboard_pid: None,
            port: None,
            command: command.into(),
        }
    }

    /// Attach the visualization process and the port it serves on
    pub fn with_tensorboard(mut self, pid: u32, port: u16) -> Self {
        self.tensorboard_pid = Some(pid);
        self.port = Some(port);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.pid == 0 || self.tensorboard_pid == Some(0) {
            return Err(ValidationError::InvalidPid);
        }
        for (field, pid) in [("pid", Some(self.pid)), ("tb_pid", self.tensorboard_pid)] {
            if let Some(pid) = pid {
                if i64::from(pid) > MAX_POSITIVE_INT {
                    return Err(ValidationError::TooLarge {
                        field,
                        value: pid.into(),
                        max: MAX_POSITIVE_INT,
                    });
                }
            }
        }
        let len = self.command.chars().count();
        if len > MAX_COMMAND_LEN {
            return Err(ValidationError::TooLong {
                field: "cmd_str",
                len,
                max: MAX_COMMAND_LEN,
            });
        }
        Ok(())
    }
}

/// One submitted training job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingRun {
    pub id: RunId,
    pub owner: User,
    pub created_at: DateTime<Utc>,
    pub params: RunParams,
    pub phase: RunPhase,
    pub tensorboard_pid: Option<u32>,
    pub port: Option<u16>,
    pub command: String,
}

impl TrainingRun {
    pub fn title(&self) -> &str {
        &self.params.title
    }

    /// Stored pid, 0 while pending
    pub fn process_id(&self) -> u32 {
        self.phase.stored_pid()
    }

    /// True exactly when no process has been launched yet
    pub fn is_pending_run(&self) -> bool {
        self.phase.is_pending()
    }

    pub fn is_process_alive(&self, supervisor: &dyn ProcessSupervisor) -> bool {
        supervisor.pid_exists(self.process_id())
    }

    pub fn is_tensorboard_process_alive(&self, supervisor: &dyn ProcessSupervisor) -> bool {
        supervisor.pid_exists(self.tensorboard_pid.unwrap_or(0))
    }

    /// Pending, or launched and re-checked against the supervisor
    pub fn status(&self, supervisor: &dyn ProcessSupervisor) -> RunStatus {
        match self.phase {
            RunPhase::Pending => RunStatus::Pending,
            RunPhase::Launched { pid } if supervisor.pid_exists(pid) => RunStatus::Running,
            RunPhase::Launched { .. } => RunStatus::Exited,
        }
    }

    pub fn log_file_path(&self, layout: &LogLayout) -> PathBuf {
        layout.log_file_path(self.title())
    }

    pub fn tensorboard_log_directory(&self, layout: &LogLayout) -> PathBuf {
        layout.tensorboard_log_directory(&self.owner.username)
    }

    /// Where to send the user after the run was created or edited
    pub fn canonical_url(&self, routes: &dyn RouteResolver) -> String {
        routes.detail_url(self.id)
    }
}

impl fmt::Display for TrainingRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

fn positive_int(field: &'static str, value: i64) -> Result<u32, ValidationError> {
    if value < 0 {
        return Err(ValidationError::Negative { field, value });
    }
    if value > MAX_POSITIVE_INT {
        return Err(ValidationError::TooLarge {
            field,
            value,
            max: MAX_POSITIVE_INT,
        });
    }
    Ok(value as u32)
}

/// Titles become file names, so they must be a single path component
fn validate_title(title: &str) -> Result<String, ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyField("title"));
    }
    let len = title.chars().count();
    if len > MAX_TITLE_LEN {
        return Err(ValidationError::TooLong {
            field: "title",
            len,
            max: MAX_TITLE_LEN,
        });
    }
    if title.contains(['/', '\\', '\0']) || title == "." || title == ".." {
        return Err(ValidationError::InvalidPathComponent {
            field: "title",
            value: title.to_string(),
        });
    }
    Ok(title.to_string())
}
