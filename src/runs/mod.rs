// Training runs - record, liveness checks and derived paths

pub mod layout;
pub mod record;
pub mod routes;
pub mod supervisor;

pub use layout::LogLayout;
pub use record::{
    LaunchRecord, LearningRate, Optimizer, RunForm, RunId, RunParams, RunPhase, RunStatus,
    TrainingRun, DEFAULT_COMMAND,
};
pub use routes::{PathRoutes, RouteResolver};
pub use supervisor::{ProcessSupervisor, SystemSupervisor};
