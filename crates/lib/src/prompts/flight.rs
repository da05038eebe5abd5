//! # Flight Extraction Prompts

/// The task description for extracting flight details from an email.
pub const FLIGHT_SYSTEM_PROMPT: &str = r#"You are a tool that extracts flight booking details from emails and their attached documents (boarding passes, e-tickets, itineraries).
Only extract information about air travel. Trains, buses, hotels, car rentals and marketing emails are not flights.
Use three-letter IATA codes for airports. Report dates as YYYY-MM-DD and times as HH:MM in the local time of the airport.
Only report a passenger name if it matches the account holder named in the prompt."#;

/// The per-email prompt.
///
/// Placeholders: `{name}`, `{html_text}`
pub const FLIGHT_USER_PROMPT: &str = r#"The account holder is {name}.
Extract the flight details for this passenger from the following email and any attached documents.

# Email
{html_text}"#;
