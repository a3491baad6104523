/// Credential store
///
/// Queries for the `users` and `positions` tables.

pub mod positions;
pub mod users;

pub use positions::Position;
pub use users::{User, UserSummary};
