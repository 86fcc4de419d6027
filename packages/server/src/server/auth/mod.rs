// Authentication for the HTTP API
pub mod jwt;

pub use jwt::*;
