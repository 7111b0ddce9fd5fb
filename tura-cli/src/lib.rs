//! Tura CLI library for the interactive wallet assistant.
//!
//! This crate provides the `tura` command-line wallet.

pub mod chatbot;

pub use chatbot::{ChatBot, ChatBotConfig};
