//! Calendar dates exchanged with clients.
//!
//! Load, unload, arrival, departure and report dates travel as `MM/DD/YYYY`
//! strings. Parsing happens at the boundary so services only ever see
//! [`NaiveDate`] values.

use chrono::NaiveDate;

/// `strftime` pattern for client-facing dates.
pub const DATE_FORMAT: &str = "%m/%d/%Y";

/// Errors raised while parsing client-supplied dates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateParseError {
    /// The value was blank once trimmed.
    #[error("date must not be empty")]
    Empty,
    /// The value is not a real calendar date in `MM/DD/YYYY` form.
    #[error("invalid date '{value}'; expected MM/DD/YYYY")]
    InvalidFormat { value: String },
}

/// Parse a `MM/DD/YYYY` date.
///
/// Surrounding whitespace is ignored; impossible dates such as `02/30/2024`
/// are rejected.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use logistics::domain::parse_form_date;
///
/// let date = parse_form_date("03/01/2024").expect("valid date");
/// assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid"));
/// assert!(parse_form_date("2024-03-01").is_err());
/// ```
pub fn parse_form_date(raw: &str) -> Result<NaiveDate, DateParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DateParseError::Empty);
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT).map_err(|_| DateParseError::InvalidFormat {
        value: trimmed.to_owned(),
    })
}

/// Render a date in `MM/DD/YYYY` form.
#[must_use]
pub fn format_form_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid calendar date")
    }

    #[rstest]
    #[case("03/01/2024", ymd(2024, 3, 1))]
    #[case("12/31/1999", ymd(1999, 12, 31))]
    #[case(" 02/29/2024 ", ymd(2024, 2, 29))]
    fn parses_month_day_year(#[case] raw: &str, #[case] expected: NaiveDate) {
        assert_eq!(parse_form_date(raw), Ok(expected));
    }

    #[rstest]
    #[case("2024-03-01")]
    #[case("13/01/2024")]
    #[case("02/30/2024")]
    #[case("02/29/2023")]
    #[case("tomorrow")]
    fn rejects_malformed_dates(#[case] raw: &str) {
        assert!(matches!(
            parse_form_date(raw),
            Err(DateParseError::InvalidFormat { .. })
        ));
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn rejects_blank_dates(#[case] raw: &str) {
        assert_eq!(parse_form_date(raw), Err(DateParseError::Empty));
    }

    #[rstest]
    fn formats_with_zero_padding() {
        assert_eq!(format_form_date(ymd(2024, 3, 5)), "03/05/2024");
    }
}
