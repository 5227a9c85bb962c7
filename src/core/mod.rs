pub mod context;
pub mod deferred;
pub mod engine;
pub mod error;
pub mod resolve;
pub mod resolver;
pub mod schema;
pub mod telemetry;
