//! Raw provider transports. Each client turns one prompt into one text
//! completion; everything above this layer is provider-agnostic.

pub mod claude;
pub mod openai;

pub use claude::ClaudeClient;
pub use openai::OpenAiClient;

const MAX_COMPLETION_TOKENS: u32 = 2000;
