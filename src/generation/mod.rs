//! Structured output and streaming generation helpers.

pub mod object;
pub mod stream;

pub use object::{generate_object, GenerateObjectResult};
pub use stream::{to_ui_message_stream, Completion, UiMessageStream};
