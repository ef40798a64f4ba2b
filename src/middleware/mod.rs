//! HTTP middleware.

mod connection_limit;

pub use connection_limit::call_limit_middleware;
