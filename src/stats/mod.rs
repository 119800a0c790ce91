//! Request and stream log formatting

mod request_log;
mod summary;

pub use request_log::*;
pub use summary::*;
