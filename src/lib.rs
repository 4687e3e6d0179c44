// Library surface shared by the binary and the integration tests.
pub mod app_dirs;
pub mod catalog;
pub mod celebration;
pub mod challenge;
pub mod challenge_store;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod ledger;
pub mod monitor;
pub mod persistence;
pub mod player;
pub mod points_counter;
pub mod profile;
pub mod runtime;
pub mod session;
pub mod store;
pub mod util;
