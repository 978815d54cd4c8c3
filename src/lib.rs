// Trainboard - training run records
// Library exports

pub mod config;
pub mod errors;
pub mod identity;
pub mod runs; // Run record, liveness checks, log layout
pub mod store; // SQLite persistence

pub use errors::{StoreError, ValidationError};
pub use identity::{User, UserId};
pub use runs::{
    LaunchRecord, LogLayout, Optimizer, PathRoutes, ProcessSupervisor, RunForm, RunId, RunPhase,
    SystemSupervisor, TrainingRun,
};
pub use store::RunStore;
