//! Type definitions

pub mod bulk;
pub mod messages;

pub use bulk::*;
pub use messages::*;
