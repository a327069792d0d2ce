/// API route handlers
///
/// - `health`: health check endpoint
/// - `auth`: registration and login
/// - `tasks`: task CRUD and assignment (bearer token required)

pub mod auth;
pub mod health;
pub mod tasks;
