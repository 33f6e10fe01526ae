//! Router Module Index
//!
//! Routing split by access level. Access control is applied per module with Axum
//! layers in `create_router`, so a route cannot end up unprotected by accident.

/// Routes accessible to all users (anonymous included).
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware.
pub mod authenticated;

/// Routes restricted to users with the 'admin' role.
pub mod admin;
