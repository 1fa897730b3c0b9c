//! Axum extractors for request handling
//!
//! Custom extractors for authentication, path ids, validation and paging.

mod auth;
mod pagination;
mod path;
mod validated;

pub use auth::AuthUser;
pub use pagination::{Pagination, PaginationParams};
pub use path::SessionIdPath;
pub use validated::ValidatedJson;
