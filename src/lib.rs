//! Delphi - staged stock-analysis pipeline.
//!
//! Delphi drives a fixed pipeline of analysis tasks over unreliable remote
//! collaborators: four ordered stages with bounded concurrency, two
//! multi-party debates with a deterministic local fallback, segmented
//! timeouts with bounded retries on every outbound call, and crash-resilient
//! resume via remote polling plus local snapshots.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, collaborator ports, and errors
//! - **Service Layer** (`services`): the orchestration engine
//! - **Application Layer** (`application`): the pipeline driver and validation
//! - **Infrastructure Layer** (`infrastructure`): HTTP and file adapters
//! - **CLI Layer** (`cli`): command-line interface

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{AnalysisPipeline, ResumeOutcome, RunReport};
pub use domain::errors::{DomainError, DomainResult, InvokeError, ServiceError};
pub use domain::models::{
    AnalysisTask, CallWeight, Config, ConcurrencyPolicy, DebateConclusion, DebateKind,
    MarketSnapshot, Session, SessionStatus, Snapshot, StagePlan, TaskState,
};
pub use domain::ports::{
    AnalysisService, CitationProvider, DebateService, MarketDataProvider, SessionStore,
    SnapshotStore,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    DebateCoordinator, ResilientInvoker, RunContext, RunEvent, SessionContinuity, StageScheduler,
    TaskRegistry, TaskRunner,
};
