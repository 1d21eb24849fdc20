//! The conversational reply collaborator: prompt assembly from the
//! business context, per-session history, response cleanup, and the HTTP
//! client implementing [`bookline_core::ReplyGenerator`].

mod llm;
mod prompt;
mod sanitize;

pub use llm::{CannedReplyGenerator, HttpLlmClient, LlmSettings};
pub use prompt::build_system_prompt;
pub use sanitize::dedupe_repeats;
