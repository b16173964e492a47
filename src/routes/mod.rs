/// Router Module Index
///
/// Routes are split by who may reach them. Access control is applied per
/// module with a route layer in `create_router`, never inside handlers.

/// Pages and actions open to every visitor.
pub mod public;

/// The researcher tier (`/dashboard/**`), behind `guard::require_session`.
pub mod authenticated;

/// The admin tier (`/admin/**`), behind `guard::require_admin`.
pub mod admin;
