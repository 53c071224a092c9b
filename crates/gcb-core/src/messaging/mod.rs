//! Delivery sink port plus decorators wrapping it.

pub mod port;
pub mod timeout;
pub mod types;
