//! External completion API: wire types and client.

pub mod completion;
pub mod openai;

pub use completion::{CompletionApi, HttpCompletionClient, UpstreamError, UpstreamReply};
pub use openai::{ChatCompletionRequest, ChatMessage};
