//! # Task Assignment Shared Library
//!
//! Core types and services behind the task assignment API: accounts, access
//! tokens, tasks, and the deferred assignment of tasks to people who have
//! not registered yet.
//!
//! ## Module Organization
//!
//! - `auth`: password hashing, JWT issuance and the bearer-token middleware
//! - `db`: Postgres pool and migrations
//! - `error`: the service error kinds
//! - `models`: users and tasks
//! - `notify`: invitation emails
//! - `services`: identity manager and assignment coordinator
//! - `store`: persistence port with Postgres and in-memory adapters

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod notify;
pub mod services;
pub mod store;

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
