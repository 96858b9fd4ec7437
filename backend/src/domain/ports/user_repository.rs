//! Port abstraction for user persistence adapters and their errors.
use async_trait::async_trait;

use crate::domain::{PasswordDigest, Role, User, UserId, Username};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by user repository adapters.
    pub enum UserRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "user repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user repository query failed: {message}",
        /// The username is already registered.
        DuplicateUsername { username: String } => "username '{username}' is already taken",
    }
}

/// User row together with its stored password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUser {
    pub user: User,
    pub password: PasswordDigest,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account.
    async fn insert(
        &self,
        username: &Username,
        password: &PasswordDigest,
        role: Role,
    ) -> Result<User, UserRepositoryError>;

    /// Fetch an account and its hash by username.
    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<StoredUser>, UserRepositoryError>;

    /// Fetch an account by identifier.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserRepositoryError>;
}
