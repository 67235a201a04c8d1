//! Parsing of header values into display views and dates.

use std::fmt::Write;

use chrono::{DateTime, Datelike, FixedOffset, Local, Utc};

use crate::error::GmailError;
use crate::part::Part;

/// Default pattern for parsing and rendering delivery dates.
pub const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Removed from a render pattern when the date falls in the current year.
const YEAR_SUFFIX: &str = ", %Y";

/// Display name or bare address from a `From` value.
///
/// `"Jane Doe" <jane@example.com>` gives `Jane Doe`, `<jane@example.com>` gives
/// `jane@example.com`, anything else is returned unchanged.
pub fn parse_sender(from: &str) -> String {
    if from.contains('"') {
        return from.split('"').nth(1).unwrap_or_default().to_string();
    }
    if let Some((_, rest)) = from.split_once('<') {
        return rest.replace('>', "");
    }
    from.to_string()
}

/// Delivery date of a message.
///
/// `Received` wins over `Date`. For `Received` only the text after the last
/// `"; "` is the date, and a trailing `(comment)` is dropped.
pub fn delivery_date(root: &Part) -> Result<Option<DateTime<FixedOffset>>, GmailError> {
    if let Some(received) = root.get_header("Received") {
        return parse_date(received_date_part(&received.value)).map(Some);
    }
    match root.get_header("Date") {
        Some(date) => parse_date(date.value.trim()).map(Some),
        None => Ok(None),
    }
}

fn received_date_part(value: &str) -> &str {
    let date = value.rsplit_once("; ").map_or(value, |(_, date)| date);
    strip_comment(date)
}

fn strip_comment(value: &str) -> &str {
    value.split_once('(').map_or(value, |(date, _)| date).trim()
}

/// Parse with [`DATE_FORMAT`], falling back to RFC 2822 rules.
///
/// A trailing `(comment)` such as a zone name is ignored.
pub fn parse_date(value: &str) -> Result<DateTime<FixedOffset>, GmailError> {
    let bare = strip_comment(value);
    DateTime::parse_from_str(bare, DATE_FORMAT).or_else(|strict| {
        DateTime::parse_from_rfc2822(bare).map_err(|_| GmailError::DateParse {
            value: value.to_string(),
            reason: strict.to_string(),
        })
    })
}

/// Render `date` in local time.
///
/// `, %Y` is stripped from `format` when the date is in the current year.
pub fn format_date(date: &DateTime<FixedOffset>, format: &str) -> Result<String, GmailError> {
    format_date_relative_to(date, format, Local::now().year())
}

fn format_date_relative_to(
    date: &DateTime<FixedOffset>,
    format: &str,
    current_year: i32,
) -> Result<String, GmailError> {
    let local = date.with_timezone(&Local);
    let pattern = if local.year() == current_year {
        format.replace(YEAR_SUFFIX, "")
    } else {
        format.to_string()
    };

    let mut rendered = String::new();
    write!(rendered, "{}", local.format(&pattern))
        .map_err(|_| GmailError::InvalidDateFormat(format.to_string()))?;
    Ok(rendered)
}

/// `internalDate` (epoch milliseconds as a string) as a UTC timestamp.
pub fn parse_internal_date(internal_date: Option<&str>) -> Result<DateTime<Utc>, GmailError> {
    let raw = internal_date.unwrap_or_default();
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .ok_or_else(|| GmailError::InvalidInternalDate(raw.to_string()))
}
