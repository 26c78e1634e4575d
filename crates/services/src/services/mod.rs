pub mod adapters;
pub mod auth;
pub mod backends;
pub mod config;
pub mod context_bridge;
pub mod execution_store;
pub mod orchestrator;
pub mod routing;
pub mod unified;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

#[cfg(test)]
mod orchestrator_tests;
