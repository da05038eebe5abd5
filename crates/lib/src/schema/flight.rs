use super::{render_template, ExtractionSchema, MetaSchema, TextContext};
use crate::errors::ExtractError;
use crate::prompts::{
    core::with_json_instructions,
    flight::{FLIGHT_SYSTEM_PROMPT, FLIGHT_USER_PROMPT},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Flight details extracted from one booking email.
///
/// Every field is optional: a boarding pass rarely carries all of them. Keys
/// outside this set are rejected, and so is an object with no field set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FlightInfo {
    /// IATA code of the departure airport, e.g. "SFO".
    pub airport_code_src: Option<String>,
    /// IATA code of the arrival airport, e.g. "JFK".
    pub airport_code_dst: Option<String>,
    /// Marketing flight number including the airline prefix, e.g. "UA1234".
    pub flight_number: Option<String>,
    /// Departure date as YYYY-MM-DD.
    pub flight_takeoff_date: Option<String>,
    /// Local departure time as HH:MM.
    pub flight_takeoff_time: Option<String>,
    /// Local arrival time as HH:MM.
    pub flight_landing_time: Option<String>,
    /// Passenger name as printed on the booking.
    pub passenger_name: Option<String>,
}

impl ExtractionSchema for FlightInfo {
    const NAME: &'static str = "flight_info";

    fn system_prompt(meta_schema: &MetaSchema) -> String {
        // A BTreeMap of strings always serializes.
        let schema_json = meta_schema.to_json().unwrap_or_default();
        with_json_instructions(FLIGHT_SYSTEM_PROMPT, &schema_json)
    }

    fn user_prompt(context: &TextContext) -> Result<String, ExtractError> {
        render_template(FLIGHT_USER_PROMPT, context)
    }

    fn check_record(&self) -> Result<(), String> {
        let fields = [
            &self.airport_code_src,
            &self.airport_code_dst,
            &self.flight_number,
            &self.flight_takeoff_date,
            &self.flight_takeoff_time,
            &self.flight_landing_time,
            &self.passenger_name,
        ];
        if fields.iter().all(|field| field.is_none()) {
            return Err("no flight field has a value".to_string());
        }
        Ok(())
    }
}
