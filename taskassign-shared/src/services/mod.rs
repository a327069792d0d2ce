/// Core services
///
/// - [`identity`]: registration, login and token verification
/// - [`assignment`]: task lifecycle, assignment by email and deferred claims
///
/// Both take their collaborators (store, notifier, clock) as trait objects so
/// the HTTP layer and the tests can wire in whichever adapters they need.

pub mod assignment;
pub mod identity;

pub use assignment::{AssignmentCoordinator, ClaimOutcome};
pub use identity::IdentityManager;
