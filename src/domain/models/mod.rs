//! Domain models.

pub mod config;
pub mod debate;
pub mod market;
pub mod session;
pub mod snapshot;
pub mod stage;
pub mod task;

pub use config::{
    Config, ContinuityConfig, DebateConfig, InvokerConfig, LoggingConfig, SchedulerConfig,
    ServicesConfig,
};
pub use debate::{
    map_verdict, ConclusionLabel, DebateConclusion, DebateKind, DebateRound, SideView,
};
pub use market::MarketSnapshot;
pub use session::{Session, SessionStatus};
pub use snapshot::{Snapshot, SNAPSHOT_VERSION};
pub use stage::{ConcurrencyPolicy, StagePlan};
pub use task::{estimate_tokens, AnalysisTask, CallWeight, Citation, ProgressEntry, TaskState};
