//! Text field validation shared by registration commands.

/// Validation failure for a single client-supplied field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldValidationError {
    /// A required field was blank once trimmed.
    #[error("{field} must not be empty")]
    Blank { field: &'static str },
    /// A field exceeded its maximum length.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
}

impl FieldValidationError {
    /// Client-facing name of the offending field.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            Self::Blank { field } | Self::TooLong { field, .. } => field,
        }
    }
}

/// Trim `raw` and require it to be non-empty and at most `max` characters.
pub(crate) fn required_text(
    raw: &str,
    field: &'static str,
    max: usize,
) -> Result<String, FieldValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FieldValidationError::Blank { field });
    }
    if trimmed.chars().count() > max {
        return Err(FieldValidationError::TooLong { field, max });
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("crate", Ok("crate".to_owned()))]
    #[case("  pallet  ", Ok("pallet".to_owned()))]
    #[case("   ", Err(FieldValidationError::Blank { field: "tag" }))]
    #[case("pallets", Err(FieldValidationError::TooLong { field: "tag", max: 6 }))]
    fn required_text_validates(
        #[case] raw: &str,
        #[case] expected: Result<String, FieldValidationError>,
    ) {
        assert_eq!(required_text(raw, "tag", 6), expected);
    }
}
