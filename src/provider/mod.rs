//! LLM provider abstraction for ai.
//!
//! Wraps rig-core's provider clients behind a [`Provider`] struct with enum
//! dispatch that implements [`ChatModel`](crate::agent::ChatModel). Supports
//! Anthropic, OpenAI, OpenRouter, and Ollama (local) via [`ProviderKind`].

mod client;
mod kind;
mod resolve;

pub use client::Provider;
pub use resolve::{resolve_model, ModelSelection};
