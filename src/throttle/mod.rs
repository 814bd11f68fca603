//! Request throttling module
//!
//! Keeps a read inside the remote source's request rate limit.
//!
//! # Features
//!
//! - **Token bucket**: `RateLimiter` wraps the governor crate
//! - **Decorator**: `ThrottledApi` makes any `TableApi` wait for a permit
//!   before each remote call; the wait is abandoned on cancellation

mod rate_limit;
mod throttled;

pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use throttled::ThrottledApi;
