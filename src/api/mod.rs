//! Chat API types

mod chat;

pub use chat::*;
