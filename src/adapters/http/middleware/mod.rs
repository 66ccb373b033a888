//! Request extractors shared by every route group.

mod auth;

pub use auth::{AdminUser, AuthenticatedUser, USER_ID_HEADER};
