//! Core types for chatcast.

pub mod chunk;
pub mod generation;
pub mod message;
pub mod stream;
pub mod usage;

pub use chunk::*;
pub use generation::*;
pub use message::*;
pub use stream::*;
pub use usage::*;
