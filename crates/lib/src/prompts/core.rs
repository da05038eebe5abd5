//! # Shared Prompt Fragments
//!
//! Fragments appended to every schema's system prompt.

/// Instructs the model to answer with a bare JSON object shaped like the
/// meta-schema that follows it.
pub const JSON_PROMPT: &str = "Your response should be in JSON format ONLY. Do NOT include any other output in your response. Below is the JSON format your output should be in:";

/// Instructs the model how to report that nothing relevant was found.
pub const EMPTY_RESULT_PROMPT: &str = "If the content does not contain what you are asked to extract, respond with an empty JSON object: {}";

/// Joins a task description with the JSON output instructions and the
/// serialized meta-schema.
pub fn with_json_instructions(task: &str, meta_schema_json: &str) -> String {
    [task, EMPTY_RESULT_PROMPT, JSON_PROMPT, meta_schema_json].join("\n")
}
