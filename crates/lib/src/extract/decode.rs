//! Decoding of one raw model output into an [`ExtractionResult`].

use super::types::ExtractionResult;
use crate::schema::ExtractionSchema;
use serde_json::Value;

/// Restores the priming prefix and validates the output against `S`.
///
/// `{}` (after restoration) is a legitimate "nothing found" and maps to
/// [`ExtractionResult::Empty`]. Anything that is not a JSON object, or an object
/// that does not deserialize into `S` or fails [`ExtractionSchema::check_record`],
/// is [`ExtractionResult::Malformed`].
pub fn decode_output<S: ExtractionSchema>(raw: &str, prefix: Option<&str>) -> ExtractionResult<S> {
    let restored = format!("{}{raw}", prefix.unwrap_or_default());

    let value: Value = match serde_json::from_str(&restored) {
        Ok(value) => value,
        Err(e) => return ExtractionResult::Malformed(format!("invalid JSON: {e}")),
    };

    match &value {
        Value::Object(map) if map.is_empty() => return ExtractionResult::Empty,
        Value::Object(_) => {}
        other => {
            return ExtractionResult::Malformed(format!(
                "expected a JSON object, got {}",
                json_kind(other)
            ))
        }
    }

    // Validate the raw text rather than the intermediate value.
    match serde_json::from_str::<S>(&restored) {
        Ok(record) => match record.check_record() {
            Ok(()) => ExtractionResult::Record(record),
            Err(reason) => ExtractionResult::Malformed(format!("schema validation failed: {reason}")),
        },
        Err(e) => ExtractionResult::Malformed(format!("schema validation failed: {e}")),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FlightInfo, SanityCheck};

    #[test]
    fn test_primed_empty_object_is_empty() {
        let result = decode_output::<FlightInfo>("}", Some("{"));
        assert_eq!(result, ExtractionResult::Empty);
    }

    #[test]
    fn test_unprimed_empty_object_is_empty() {
        let result = decode_output::<FlightInfo>(" {} ", None);
        assert_eq!(result, ExtractionResult::Empty);
    }

    #[test]
    fn test_primed_record_is_restored() {
        let result =
            decode_output::<SanityCheck>("\"is_there_text_in_the_prompt\": true}", Some("{"));
        assert_eq!(
            result,
            ExtractionResult::Record(SanityCheck {
                is_there_text_in_the_prompt: true
            })
        );
    }

    #[test]
    fn test_prose_is_malformed() {
        let result = decode_output::<SanityCheck>("Sure! Here is the JSON", Some("{"));
        assert!(matches!(result, ExtractionResult::Malformed(reason) if reason.starts_with("invalid JSON")));
    }

    #[test]
    fn test_wrong_field_type_is_malformed() {
        let result = decode_output::<SanityCheck>(
            "\"is_there_text_in_the_prompt\": \"maybe\"}",
            Some("{"),
        );
        assert!(matches!(result, ExtractionResult::Malformed(reason) if reason.starts_with("schema validation failed")));
    }

    #[test]
    fn test_non_object_is_malformed() {
        let result = decode_output::<FlightInfo>("[1, 2]", None);
        assert!(matches!(result, ExtractionResult::Malformed(reason) if reason.contains("an array")));
    }

    #[test]
    fn test_partial_flight_record_is_accepted() {
        let result = decode_output::<FlightInfo>(
            r#""airport_code_src": "SFO", "airport_code_dst": "JFK", "flight_number": "UA1234"}"#,
            Some("{"),
        );
        let record = result.into_record().unwrap();
        assert_eq!(record.airport_code_src.as_deref(), Some("SFO"));
        assert_eq!(record.flight_landing_time, None);
    }

    #[test]
    fn test_foreign_keys_are_malformed() {
        let result = decode_output::<FlightInfo>(
            r#""train_number": "ICE 123", "seat": "4A"}"#,
            Some("{"),
        );
        assert!(matches!(result, ExtractionResult::Malformed(reason) if reason.contains("train_number")));
    }

    #[test]
    fn test_flight_key_mixed_with_foreign_key_is_malformed() {
        let result = decode_output::<FlightInfo>(
            r#""passenger_name": "Shrey Patel", "train_number": "ICE 123"}"#,
            Some("{"),
        );
        assert!(matches!(result, ExtractionResult::Malformed(_)));
    }

    #[test]
    fn test_all_null_flight_object_is_malformed() {
        let result = decode_output::<FlightInfo>(
            r#""airport_code_src": null, "flight_number": null}"#,
            Some("{"),
        );
        assert!(matches!(result, ExtractionResult::Malformed(reason) if reason.contains("no flight field")));
    }
}
