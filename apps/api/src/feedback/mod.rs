// Resume feedback: schema, prompt composition, AI response handling.
// All LLM calls go through llm_client.

pub mod extract;
pub mod prompts;
pub mod service;
pub mod types;

pub use extract::{parse_feedback, FeedbackParseError};
pub use service::{AnthropicFeedbackService, FeedbackService};
pub use types::{FeedbackSlot, FeedbackValue};
