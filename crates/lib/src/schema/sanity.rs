use super::{render_template, ExtractionSchema, MetaSchema, TextContext};
use crate::errors::ExtractError;
use crate::prompts::{
    core::with_json_instructions,
    sanity::{SANITY_CHECK_SYSTEM_PROMPT, SANITY_CHECK_USER_PROMPT},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Whether a word occurs in a piece of text. Used to smoke-test a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SanityCheck {
    pub is_there_text_in_the_prompt: bool,
}

impl ExtractionSchema for SanityCheck {
    const NAME: &'static str = "sanity_check";

    fn system_prompt(meta_schema: &MetaSchema) -> String {
        let schema_json = meta_schema.to_json().unwrap_or_default();
        with_json_instructions(SANITY_CHECK_SYSTEM_PROMPT, &schema_json)
    }

    fn user_prompt(context: &TextContext) -> Result<String, ExtractError> {
        render_template(SANITY_CHECK_USER_PROMPT, context)
    }
}
