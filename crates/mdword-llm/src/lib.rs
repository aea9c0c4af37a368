//! # mdword-llm — document generation via an OpenAI-compatible API
//!
//! A small blocking chat-completions client plus the prompt templates
//! that turn raw notes into well-structured Markdown. The client works
//! against any OpenAI-compatible endpoint; the defaults target
//! DashScope's compatible mode with the Qwen models.

pub mod client;
pub mod config;
pub mod templates;

pub use client::LlmClient;
pub use config::LlmConfig;
