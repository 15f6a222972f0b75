pub mod benchmark;
pub mod clock;
pub mod config;
pub mod crds;
pub mod error;
pub mod lifecycle;
pub mod store;
pub mod telemetry;
pub mod timing;
pub mod workspace;
