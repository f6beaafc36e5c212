//! HTTP front end for the Aegis gateway.
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::missing_panics_doc,
        reason = "Allow for tests"
    )
)]

pub mod api;
pub mod bootstrap;
/// Command-line arguments
pub mod cli;

pub use api::{ApiError, router};
pub use bootstrap::{build_gateway, load_config, mock_gateway, spawn_cache_sweeper};
pub use cli::Cli;
