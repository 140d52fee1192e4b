//! Infrastructure layer: concrete adapters for the domain ports plus
//! config loading and logging setup.

pub mod config;
pub mod http;
pub mod logging;
pub mod snapshot;

pub use config::{ConfigError, ConfigLoader};
pub use http::{
    HttpAnalysisService, HttpCitationProvider, HttpDebateService, HttpMarketDataProvider,
    HttpSessionStore,
};
pub use snapshot::FileSnapshotStore;
