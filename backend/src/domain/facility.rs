//! Facilities that store assets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::validation::{FieldValidationError, required_text};

/// Maximum accepted length of any facility text field.
pub const FACILITY_FIELD_MAX: usize = 128;

/// Serial identifier of a facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacilityId(i32);

impl FacilityId {
    /// Wrap a raw identifier.
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// Raw identifier value.
    #[must_use]
    pub const fn value(self) -> i32 {
        self.0
    }
}

impl fmt::Display for FacilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered facility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Facility {
    pub id: FacilityId,
    pub code: String,
    pub common_name: String,
    pub location: String,
}

/// Validated facility registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFacility {
    code: String,
    common_name: String,
    location: String,
}

impl NewFacility {
    /// Validate and trim facility fields.
    pub fn try_new(
        code: &str,
        common_name: &str,
        location: &str,
    ) -> Result<Self, FieldValidationError> {
        Ok(Self {
            code: required_text(code, "code", FACILITY_FIELD_MAX)?,
            common_name: required_text(common_name, "commonName", FACILITY_FIELD_MAX)?,
            location: required_text(location, "location", FACILITY_FIELD_MAX)?,
        })
    }

    /// Short facility code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Human-readable name.
    pub fn common_name(&self) -> &str {
        &self.common_name
    }

    /// Free-form location.
    pub fn location(&self) -> &str {
        &self.location
    }
}

/// Facility filter for the asset report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacilitySelector {
    /// Every facility.
    #[default]
    All,
    /// A single facility.
    One(FacilityId),
}

impl FacilitySelector {
    /// The selected facility, if restricted to one.
    #[must_use]
    pub const fn facility(self) -> Option<FacilityId> {
        match self {
            Self::All => None,
            Self::One(id) => Some(id),
        }
    }
}

/// Error returned when a facility selector cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("facility must be 'All' or a facility id, got '{value}'")]
pub struct FacilitySelectorParseError {
    value: String,
}

impl FromStr for FacilitySelector {
    type Err = FacilitySelectorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        trimmed
            .parse::<i32>()
            .map(|id| Self::One(FacilityId::new(id)))
            .map_err(|_| FacilitySelectorParseError {
                value: s.to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn new_facility_trims_fields() {
        let facility = NewFacility::try_new(" HQ ", " Headquarters ", " Arlington, VA ")
            .expect("valid facility");
        assert_eq!(facility.code(), "HQ");
        assert_eq!(facility.common_name(), "Headquarters");
        assert_eq!(facility.location(), "Arlington, VA");
    }

    #[rstest]
    #[case("", "Headquarters", "Arlington", "code")]
    #[case("HQ", "  ", "Arlington", "commonName")]
    #[case("HQ", "Headquarters", "", "location")]
    fn blank_fields_are_rejected(
        #[case] code: &str,
        #[case] name: &str,
        #[case] location: &str,
        #[case] field: &str,
    ) {
        let err = NewFacility::try_new(code, name, location).expect_err("blank field");
        assert_eq!(err.field(), field);
    }

    #[rstest]
    #[case("All", FacilitySelector::All)]
    #[case("all", FacilitySelector::All)]
    #[case("12", FacilitySelector::One(FacilityId::new(12)))]
    fn selector_parses(#[case] raw: &str, #[case] expected: FacilitySelector) {
        assert_eq!(raw.parse::<FacilitySelector>(), Ok(expected));
    }

    #[rstest]
    fn selector_rejects_names() {
        assert!("Headquarters".parse::<FacilitySelector>().is_err());
    }
}
