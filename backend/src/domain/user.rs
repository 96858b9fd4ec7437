//! User accounts, roles and caller identity.
//!
//! Every workflow operation receives an explicit [`CallerIdentity`]; the
//! role it carries decides which mutations the caller may perform.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::Error;

/// Maximum accepted username length in characters.
pub const USERNAME_MAX: usize = 64;

/// Validation errors for user-facing account fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserValidationError {
    /// Username was blank once trimmed.
    #[error("username must not be empty")]
    EmptyUsername,
    /// Username exceeded [`USERNAME_MAX`].
    #[error("username must be at most {max} characters")]
    UsernameTooLong { max: usize },
    /// The stored or supplied role code is not recognised.
    #[error("unknown role code {code}")]
    UnknownRole { code: i32 },
    /// The supplied role name is not recognised.
    #[error("unknown role '{name}'")]
    UnknownRoleName { name: String },
}

/// Serial identifier of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i32);

impl UserId {
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

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role granted to an account.
///
/// Stored as the integer codes `1`, `2` and `3`; exchanged with clients as
/// snake_case names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// May log in and read reports.
    #[default]
    Guest,
    /// Requests transfers, records load and unload events, disposes assets.
    LogisticsOfficer,
    /// Approves or rejects pending transfer requests.
    FacilityOfficer,
}

impl Role {
    /// Persistent integer code for the role.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Guest => 1,
            Self::LogisticsOfficer => 2,
            Self::FacilityOfficer => 3,
        }
    }

    /// Decode a persistent role code.
    pub fn from_code(code: i32) -> Result<Self, UserValidationError> {
        match code {
            1 => Ok(Self::Guest),
            2 => Ok(Self::LogisticsOfficer),
            3 => Ok(Self::FacilityOfficer),
            other => Err(UserValidationError::UnknownRole { code: other }),
        }
    }

    /// Stable snake_case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::LogisticsOfficer => "logistics_officer",
            Self::FacilityOfficer => "facility_officer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UserValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "guest" | "1" => Ok(Self::Guest),
            "logistics_officer" | "2" => Ok(Self::LogisticsOfficer),
            "facility_officer" | "3" => Ok(Self::FacilityOfficer),
            _ => Err(UserValidationError::UnknownRoleName { name: s.to_owned() }),
        }
    }
}

/// Validated, trimmed username.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Username(String);

impl Username {
    /// Validate and construct a username.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(UserValidationError::EmptyUsername);
        }
        if trimmed.chars().count() > USERNAME_MAX {
            return Err(UserValidationError::UsernameTooLong { max: USERNAME_MAX });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the username.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registered account as seen by the rest of the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    pub role: Role,
}

impl User {
    /// Identity used when this user calls into the workflow engine.
    #[must_use]
    pub fn identity(&self) -> CallerIdentity {
        CallerIdentity::new(self.id, self.role)
    }
}

/// The authenticated caller of a service operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerIdentity {
    user_id: UserId,
    role: Role,
}

impl CallerIdentity {
    /// Construct an identity.
    #[must_use]
    pub const fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Calling user.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Role held by the calling user.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Require one of `allowed`, otherwise fail with a forbidden error whose
    /// details carry `role_required`.
    ///
    /// # Examples
    /// ```
    /// use logistics::domain::{CallerIdentity, ErrorCode, Role, UserId};
    ///
    /// let guest = CallerIdentity::new(UserId::new(1), Role::Guest);
    /// let err = guest
    ///     .require_any(&[Role::LogisticsOfficer], "request transfers")
    ///     .expect_err("guests cannot request transfers");
    /// assert_eq!(err.code(), ErrorCode::Forbidden);
    /// ```
    pub fn require_any(&self, allowed: &[Role], action: &str) -> Result<(), Error> {
        if allowed.contains(&self.role) {
            return Ok(());
        }
        let required: Vec<&str> = allowed.iter().map(|role| role.as_str()).collect();
        Err(
            Error::forbidden(format!("{} may not {action}", self.role)).with_details(json!({
                "code": "role_required",
                "required": required,
                "actual": self.role.as_str(),
            })),
        )
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    #[rstest]
    #[case(Role::Guest, 1)]
    #[case(Role::LogisticsOfficer, 2)]
    #[case(Role::FacilityOfficer, 3)]
    fn role_codes_are_stable(#[case] role: Role, #[case] code: i32) {
        assert_eq!(role.code(), code);
        assert_eq!(Role::from_code(code), Ok(role));
    }

    #[rstest]
    fn unknown_role_code_is_rejected() {
        assert_eq!(
            Role::from_code(9),
            Err(UserValidationError::UnknownRole { code: 9 })
        );
    }

    #[rstest]
    #[case("facility_officer", Role::FacilityOfficer)]
    #[case(" Logistics_Officer ", Role::LogisticsOfficer)]
    #[case("1", Role::Guest)]
    fn role_parses_names_and_codes(#[case] raw: &str, #[case] expected: Role) {
        assert_eq!(raw.parse::<Role>(), Ok(expected));
    }

    #[rstest]
    #[case("", UserValidationError::EmptyUsername)]
    #[case("   ", UserValidationError::EmptyUsername)]
    fn blank_usernames_are_rejected(#[case] raw: &str, #[case] expected: UserValidationError) {
        assert_eq!(Username::new(raw), Err(expected));
    }

    #[rstest]
    fn long_usernames_are_rejected() {
        let raw = "a".repeat(USERNAME_MAX + 1);
        assert_eq!(
            Username::new(raw),
            Err(UserValidationError::UsernameTooLong { max: USERNAME_MAX })
        );
    }

    #[rstest]
    fn usernames_are_trimmed() {
        let name = Username::new("  ada  ").expect("valid username");
        assert_eq!(name.as_str(), "ada");
    }

    #[rstest]
    fn require_any_accepts_listed_roles() {
        let caller = CallerIdentity::new(UserId::new(7), Role::LogisticsOfficer);
        assert!(
            caller
                .require_any(&[Role::LogisticsOfficer, Role::FacilityOfficer], "register")
                .is_ok()
        );
    }

    #[rstest]
    fn require_any_reports_role_required() {
        let caller = CallerIdentity::new(UserId::new(7), Role::LogisticsOfficer);
        let err = caller
            .require_any(&[Role::FacilityOfficer], "approve transfers")
            .expect_err("logistics officers cannot approve");
        assert_eq!(err.code(), ErrorCode::Forbidden);
        assert_eq!(err.detail_code(), Some("role_required"));
    }
}
