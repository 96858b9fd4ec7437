//! Driving port for account registration and login.
//!
//! Inbound adapters call it to authenticate credentials without knowing the
//! backing infrastructure.

use async_trait::async_trait;

use crate::domain::{Error, LoginCredentials, NewAccount, User, UserId};

/// Domain use-case port for accounts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Register a new account.
    async fn create_user(&self, account: NewAccount) -> Result<User, Error>;

    /// Validate credentials and return the authenticated user.
    async fn authenticate(&self, credentials: &LoginCredentials) -> Result<User, Error>;

    /// Fetch the account behind a session.
    async fn current_user(&self, user_id: UserId) -> Result<User, Error>;
}
