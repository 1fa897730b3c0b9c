//! Access-token validation

mod jwt;

pub use jwt::{Claims, JwtService};
