// Infrastructure layer (shared components)
pub mod infrastructure;

pub use infrastructure::config;
pub use infrastructure::error;
pub use infrastructure::metrics;
pub use infrastructure::redis;

// Domain layer (business logic)
pub mod domain;
pub mod i18n;
pub mod payload;
pub mod subscription;

// Dispatch and execution
pub mod bus;
pub mod tasks;
pub mod worker;

// Application layer
pub mod api;
pub mod server;
pub mod triggers;

// Supporting modules
pub mod telemetry;
