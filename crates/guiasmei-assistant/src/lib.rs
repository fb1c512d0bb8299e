//! Conversational assistant for GuiasMEI.
//!
//! Assembles the system prompt for the user's profile and talks to an
//! OpenAI-compatible chat endpoint. Without an API key the assistant
//! degrades to a fixed reply instead of failing the request.

pub mod client;
pub mod prompts;

pub use client::{AssistantClient, FALLBACK_REPLY};
pub use prompts::{context_block, system_prompt, UserProfile, PROMPT_VERSION};
