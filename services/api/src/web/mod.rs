pub mod auth;
pub mod client;
pub mod confirmations;
pub mod dashboard;
pub mod deductions;
pub mod jobs;
pub mod middleware;
pub mod rest;
pub mod router;
pub mod schema;
pub mod state;
pub mod tasks;
pub mod token;
pub mod users;

// Re-export the router builder for the binary and the integration tests.
pub use middleware::{require_auth, Principal};
pub use router::build_router;
