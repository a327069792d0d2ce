/// Data models and their Postgres operations
///
/// # Models
///
/// - `user`: Accounts, password digests, email helpers
/// - `task`: Tasks and their claimed/pending ownership state

pub mod task;
pub mod user;
