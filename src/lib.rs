pub mod api_client;
pub mod config;
pub mod container_runtime;
pub mod control_protocol;
pub mod error;
pub mod models;
pub mod navigation;
pub mod persistence;
pub mod rate_limiter;
pub mod route_planner;
