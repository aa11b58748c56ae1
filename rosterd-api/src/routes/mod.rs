/// API route handlers
///
/// Each submodule owns one resource: `users` and `organizations` for the
/// CRUD surfaces, `token` for authentication, `health` for liveness.

pub mod health;
pub mod organizations;
pub mod token;
pub mod users;
