//! Batch simulation: entry points, trial execution and aggregation

pub mod aggregate;
pub mod context;
pub mod control;
pub mod handle;
pub mod orchestrator;

pub use aggregate::{
    aggregate, aggregate_arena, aggregate_stage, AggregateResult, ArenaTally, OutcomeKind,
    StageTally,
};
pub use context::{LocalCombatant, LocalRequest, LogSink, RemoteRequest, SimulationContext, Target};
pub use control::{BatchControl, BatchStatus, ProgressCallback};
pub use handle::BatchHandle;
pub use orchestrator::{run_batch, run_one, trial_seed, BatchReport, SeedPolicy, TrialCount};
