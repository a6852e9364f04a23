//! Request middleware

mod auth;

pub use auth::api_key_middleware;
