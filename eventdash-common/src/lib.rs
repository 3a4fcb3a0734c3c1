//! Wire types shared between the dashboard client and the event backend.

pub mod types;

pub use types::*;
