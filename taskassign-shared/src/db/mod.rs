/// Database access
///
/// - [`pool`]: connection pool setup and health checks
/// - [`migrations`]: embedded schema migrations

pub mod migrations;
pub mod pool;
