//! # Schema Contract
//!
//! An extraction target is a plain Rust type that implements [`ExtractionSchema`].
//! The type's fields (via `serde` + `schemars`) describe the record the model must
//! return, and the trait supplies the two prompts the engine needs. The engine
//! depends only on this trait, so new targets can be added without touching it.

pub mod flight;
pub mod meta;
pub mod sanity;

pub use flight::FlightInfo;
pub use meta::{project_meta_schema, FieldSpec, MetaSchema};
pub use sanity::SanityCheck;

use crate::errors::ExtractError;
use regex::Regex;
use schemars::JsonSchema;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::OnceLock;

/// Named values interpolated into a schema's user prompt.
pub type TextContext = HashMap<String, String>;

/// A structured-output type the batch engine can extract.
pub trait ExtractionSchema:
    Serialize + DeserializeOwned + JsonSchema + Debug + Send + Sync + 'static
{
    /// A short, stable name used in logs.
    const NAME: &'static str;

    /// Renders the system prompt embedding task instructions and the meta-schema.
    ///
    /// Must be pure: the same meta-schema always yields the same prompt.
    fn system_prompt(meta_schema: &MetaSchema) -> String;

    /// Renders the per-request prompt body from the caller's text context.
    ///
    /// Fails with [`ExtractError::MissingContextField`] if the template references
    /// a key that `context` does not contain.
    fn user_prompt(context: &TextContext) -> Result<String, ExtractError>;

    /// Checks a record that deserialized cleanly but may still carry no data.
    ///
    /// An `Err` reason turns the result into a malformed one.
    fn check_record(&self) -> Result<(), String> {
        Ok(())
    }
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
    })
}

/// Substitutes every `{key}` placeholder in `template` with `context[key]`.
///
/// All placeholders are checked before any substitution happens, so a missing
/// key is reported even if it appears after a present one. Substituted values
/// are not re-scanned for placeholders.
pub fn render_template(template: &str, context: &TextContext) -> Result<String, ExtractError> {
    let re = placeholder_regex();

    if let Some(missing) = re
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .find(|key| !context.contains_key(key))
    {
        return Err(ExtractError::MissingContextField(missing));
    }

    let rendered = re.replace_all(template, |caps: &regex::Captures| {
        context
            .get(&caps[1])
            .cloned()
            .unwrap_or_default()
    });
    Ok(rendered.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(pairs: &[(&str, &str)]) -> TextContext {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_template_substitutes_all_keys() {
        let ctx = context(&[("word", "solo"), ("text", "solo bolo")]);
        let rendered = render_template("Find {word} in {text}, {word}!", &ctx).unwrap();
        assert_eq!(rendered, "Find solo in solo bolo, solo!");
    }

    #[test]
    fn test_render_template_reports_missing_key() {
        let ctx = context(&[("word", "solo")]);
        let err = render_template("Find {word} in {text}", &ctx).unwrap_err();
        assert!(matches!(err, ExtractError::MissingContextField(key) if key == "text"));
    }

    #[test]
    fn test_render_template_does_not_rescan_values() {
        let ctx = context(&[("a", "{b}")]);
        assert_eq!(render_template("x {a} y", &ctx).unwrap(), "x {b} y");
    }

    #[test]
    fn test_render_template_ignores_json_braces() {
        let ctx = TextContext::new();
        assert_eq!(render_template("return {}", &ctx).unwrap(), "return {}");
    }
}
