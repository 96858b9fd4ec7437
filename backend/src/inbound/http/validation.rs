//! Request validation shared by the HTTP handlers.
//!
//! Every failure becomes an `invalid_request` error whose details name the
//! offending field and a stable `code`.

use actix_web::HttpRequest;
use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
use chrono::NaiveDate;
use serde_json::json;
use tracing::debug;

use crate::domain::{DATE_FORMAT, Error, FieldValidationError, parse_form_date};

/// Validation codes reported in `details.code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ValidationCode {
    MissingField,
    InvalidDateFormat,
    InvalidField,
    MalformedInput,
}

impl ValidationCode {
    fn as_str(self) -> &'static str {
        match self {
            Self::MissingField => "missing_field",
            Self::InvalidDateFormat => "invalid_date_format",
            Self::InvalidField => "invalid_field",
            Self::MalformedInput => "malformed_input",
        }
    }
}

/// Client-facing field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub(crate) const fn as_str(self) -> &'static str {
        self.0
    }
}

fn field_error(field: &str, code: ValidationCode, message: String) -> Error {
    Error::invalid_request(message).with_details(json!({
        "field": field,
        "code": code.as_str(),
    }))
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    let field = field.as_str();
    field_error(
        field,
        ValidationCode::MissingField,
        format!("missing required field: {field}"),
    )
}

pub(crate) fn invalid_date_error(field: FieldName, value: &str) -> Error {
    let name = field.as_str();
    Error::invalid_request(format!("{name} must be a date in MM/DD/YYYY form")).with_details(
        json!({
            "field": name,
            "value": value,
            "format": DATE_FORMAT,
            "code": ValidationCode::InvalidDateFormat.as_str(),
        }),
    )
}

/// Report a registration field that failed domain validation.
pub(crate) fn invalid_field_error(error: &FieldValidationError) -> Error {
    field_error(error.field(), ValidationCode::InvalidField, error.to_string())
}

/// Field named by a serde "missing field `name`" message.
fn missing_field_name(message: &str) -> Option<&str> {
    let rest = message.strip_prefix("missing field `")?;
    rest.split_once('`').map(|(name, _)| name)
}

fn malformed_input_error(source: &str, message: String) -> Error {
    match missing_field_name(&message) {
        Some(field) => field_error(
            field,
            ValidationCode::MissingField,
            format!("missing required field: {field}"),
        ),
        None => Error::invalid_request(format!("malformed {source}: {message}"))
            .with_details(json!({ "code": ValidationCode::MalformedInput.as_str() })),
    }
}

/// Error handler for `web::JsonConfig`.
pub(crate) fn json_payload_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    debug!(error = %err, "rejected JSON body");
    let message = match &err {
        JsonPayloadError::Deserialize(source) => source.to_string(),
        other => other.to_string(),
    };
    malformed_input_error("request body", message).into()
}

/// Error handler for `web::QueryConfig`.
pub(crate) fn query_payload_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    debug!(error = %err, "rejected query string");
    let message = match &err {
        QueryPayloadError::Deserialize(source) => source.to_string(),
        other => other.to_string(),
    };
    malformed_input_error("query string", message).into()
}

/// Error handler for `web::PathConfig`.
pub(crate) fn path_error(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    debug!(error = %err, "rejected path parameter");
    let PathError::Deserialize(source) = &err else {
        return malformed_input_error("path", err.to_string()).into();
    };
    malformed_input_error("path", source.to_string()).into()
}

/// Parse a required `MM/DD/YYYY` date.
pub(crate) fn parse_date(value: &str, field: FieldName) -> Result<NaiveDate, Error> {
    if value.trim().is_empty() {
        return Err(missing_field_error(field));
    }
    parse_form_date(value).map_err(|_| invalid_date_error(field, value))
}

/// Parse an optional `MM/DD/YYYY` date; blank strings count as absent.
pub(crate) fn parse_optional_date(
    value: Option<&str>,
    field: FieldName,
) -> Result<Option<NaiveDate>, Error> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => parse_date(raw, field).map(Some),
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for request validation helpers.
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    const LOAD_DATE: FieldName = FieldName::new("loadDate");

    #[rstest]
    #[case("missing field `assetId` at line 1 column 48", Some("assetId"))]
    #[case("missing field `date`", Some("date"))]
    #[case("invalid type: string \"x\", expected i32", None)]
    fn missing_fields_are_named(#[case] message: &str, #[case] expected: Option<&str>) {
        assert_eq!(missing_field_name(message), expected);
    }

    #[rstest]
    fn malformed_input_is_reported() {
        let err = malformed_input_error("request body", "EOF while parsing".to_owned());
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
        assert_eq!(err.detail_code(), Some("malformed_input"));
    }

    #[rstest]
    fn dates_parse_in_form_format() {
        let date = parse_date(" 03/01/2024 ", LOAD_DATE).expect("valid date");
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 1).expect("date"));
    }

    #[rstest]
    #[case("2024-03-01")]
    #[case("02/30/2024")]
    #[case("yesterday")]
    fn malformed_dates_are_rejected(#[case] raw: &str) {
        let err = parse_date(raw, LOAD_DATE).expect_err("invalid date");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
        assert_eq!(err.detail_code(), Some("invalid_date_format"));
        let details = err.details().expect("details present");
        assert_eq!(details["field"], "loadDate");
        assert_eq!(details["value"], raw);
    }

    #[rstest]
    fn blank_required_dates_are_missing() {
        let err = parse_date("  ", LOAD_DATE).expect_err("blank");
        assert_eq!(err.detail_code(), Some("missing_field"));
    }

    #[rstest]
    #[case(None, None)]
    #[case(Some(""), None)]
    #[case(Some("03/05/2024"), NaiveDate::from_ymd_opt(2024, 3, 5))]
    fn optional_dates_treat_blank_as_absent(
        #[case] raw: Option<&str>,
        #[case] expected: Option<NaiveDate>,
    ) {
        assert_eq!(
            parse_optional_date(raw, LOAD_DATE).expect("valid input"),
            expected
        );
    }

    #[rstest]
    fn field_errors_carry_the_request_field() {
        let err = invalid_field_error(&FieldValidationError::Blank {
            field: "commonName",
        });
        let details = err.details().expect("details present");
        assert_eq!(details["field"], "commonName");
        assert_eq!(details["code"], "invalid_field");
        assert_eq!(err.message(), "commonName must not be empty");
    }
}
