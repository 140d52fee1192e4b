//! Domain layer: models, ports, and errors. No I/O, no presentation.

pub mod errors;
pub mod models;
pub mod ports;
