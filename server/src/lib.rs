//! Weather read-through proxy.
//!
//! Serves the current weather for provisioned cities, refreshing the cached
//! reading from the upstream provider once it is older than the freshness
//! window.

pub mod cli;
pub mod config;
pub mod db;
pub mod gate;
pub mod models;
pub mod repos;
pub mod server;
pub mod store;
pub mod tools;
pub mod upstream;
