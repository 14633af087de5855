pub mod config;
pub mod observability;
pub mod server;

pub use config::{AppConfig, LoggingConfig, StorageBackend, StorageConfig};
pub use observability::{init_tracing, shutdown_tracing};
pub use server::{SchedulerServer, ServerBuilder};
