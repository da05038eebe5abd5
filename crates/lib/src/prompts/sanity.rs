//! # Sanity Check Prompts
//!
//! A trivial extraction target used to verify the batch round trip end to end.

pub const SANITY_CHECK_SYSTEM_PROMPT: &str = "You are a tool that checks if there is a specific word or phrase in a piece of text. The specific piece of text you will be searching through will be provided in the prompt.";

/// Placeholders: `{word}`, `{text}`
pub const SANITY_CHECK_USER_PROMPT: &str = r#"Does the following text contain the word {word}? The text is "{text}""#;
