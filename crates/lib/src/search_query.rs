//! # First-Pass Mailbox Search Query
//!
//! Builds the mailbox search string that narrows an inbox down to likely flight
//! bookings before any extraction happens: a group of booking keywords, AND a
//! group of active airline names, OR any message carrying a PDF.

use crate::errors::ExtractError;
use std::collections::BTreeSet;
use std::io::Read;
use tracing::info;

/// Keyword groups commonly found in airline booking emails.
pub const FLIGHT_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "booking_terms",
        &[
            "booking",
            "confirmation",
            "reservation confirmation",
            "itinerary",
            "e-ticket",
            "electronic ticket",
            "flight confirmation",
            "travel confirmation",
            "booking reference",
            "confirmation number",
            "reservation number",
            "booking ID",
        ],
    ),
    (
        "flight_identifiers",
        &[
            "flight number",
            "flight #",
            "flight no",
            "flight no.",
            "flight details",
            "aircraft type",
            "seat assignment",
            "seat number",
        ],
    ),
    (
        "timing_terms",
        &[
            "departure time",
            "arrival time",
            "boarding time",
            "check-in time",
            "departure date",
            "arrival date",
            "scheduled departure",
            "scheduled arrival",
            "boarding starts",
            "gate closes",
        ],
    ),
    (
        "location_terms",
        &[
            "terminal",
            "gate",
            "departure gate",
            "arrival terminal",
            "airport code",
            "departure from",
            "arriving at",
        ],
    ),
    (
        "document_terms",
        &[
            "boarding pass",
            "travel document",
            "baggage claim",
            "check-in",
            "online check-in",
            "mobile boarding pass",
            "TSA",
        ],
    ),
    (
        "action_terms",
        &[
            "check in online",
            "print boarding pass",
            "manage booking",
            "view reservation",
            "select seats",
            "add baggage",
            "flight status",
        ],
    ),
    (
        "passenger_terms",
        &[
            "passenger name",
            "traveler",
            "passenger details",
            "frequent flyer",
            "loyalty number",
            "ticket number",
        ],
    ),
];

/// All keywords, flattened in group order.
pub fn flight_keywords() -> Vec<&'static str> {
    FLIGHT_KEYWORDS
        .iter()
        .flat_map(|(_, words)| words.iter().copied())
        .collect()
}

const NULL_MARKER: &str = "\\N";

/// Reads active airline names from an OpenFlights-style `airlines.dat` CSV.
///
/// The file has no header row. Columns: index, name, alias, IATA, ICAO,
/// callsign, country, active (`Y`/`N`).
pub fn load_airline_names<R: Read>(reader: R) -> Result<BTreeSet<String>, ExtractError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut names = BTreeSet::new();
    for record in csv_reader.records() {
        let record = record?;
        let active = record.get(7).map(str::trim) == Some("Y");
        let Some(name) = record.get(1).map(str::trim) else {
            continue;
        };
        if active && !name.is_empty() && name != NULL_MARKER {
            names.insert(name.to_string());
        }
    }

    info!("Loaded {} active airline names.", names.len());
    Ok(names)
}

fn required_group<'a>(terms: impl IntoIterator<Item = &'a str>) -> String {
    let joined = terms
        .into_iter()
        .map(|term| format!("+\"{}\"", term.replace('"', "")))
        .collect::<Vec<_>>()
        .join(" ");
    format!("{{{joined}}}")
}

/// Builds `{+"kw" ...} AND {+"airline" ...} OR filename:pdf`.
pub fn build_search_query<'a, 'b>(
    keywords: impl IntoIterator<Item = &'a str>,
    airlines: impl IntoIterator<Item = &'b str>,
) -> String {
    format!(
        "{} AND {} OR filename:pdf",
        required_group(keywords),
        required_group(airlines)
    )
}
