//! Account registration and password login.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use crate::domain::ports::{AccountService, UserRepository, UserRepositoryError};
use crate::domain::{Error, LoginCredentials, NewAccount, PasswordDigest, User, UserId, Username};

fn map_repository_error(error: UserRepositoryError) -> Error {
    match error {
        UserRepositoryError::Connection { message } => {
            debug!(%message, "user repository unavailable");
            Error::service_unavailable(format!("user repository unavailable: {message}"))
        }
        UserRepositoryError::Query { message } => {
            debug!(%message, "user repository query failed");
            Error::internal(format!("user repository error: {message}"))
        }
        UserRepositoryError::DuplicateUsername { username } => {
            Error::conflict(format!("username '{username}' is already taken")).with_details(
                json!({ "code": "duplicate_entity", "entity": "user", "field": "username" }),
            )
        }
    }
}

fn invalid_credentials() -> Error {
    Error::unauthorized("invalid credentials")
}

/// [`AccountService`] backed by a [`UserRepository`].
#[derive(Clone)]
pub struct AccountDirectory<R> {
    repo: Arc<R>,
}

impl<R> AccountDirectory<R> {
    /// Create a directory over a user repository.
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl<R> AccountService for AccountDirectory<R>
where
    R: UserRepository,
{
    async fn create_user(&self, account: NewAccount) -> Result<User, Error> {
        let digest = PasswordDigest::hash(account.password())
            .map_err(|err| Error::internal(err.to_string()))?;
        let user = self
            .repo
            .insert(account.username(), &digest, account.role())
            .await
            .map_err(map_repository_error)?;
        info!(user_id = user.id.value(), role = %user.role, "account created");
        Ok(user)
    }

    async fn authenticate(&self, credentials: &LoginCredentials) -> Result<User, Error> {
        // Malformed usernames cannot exist in storage.
        let Ok(username) = Username::new(credentials.username()) else {
            return Err(invalid_credentials());
        };
        let stored = self
            .repo
            .find_by_username(&username)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(invalid_credentials)?;
        if !stored.password.verify(credentials.password()) {
            return Err(invalid_credentials());
        }
        Ok(stored.user)
    }

    async fn current_user(&self, user_id: UserId) -> Result<User, Error> {
        self.repo
            .find_by_id(user_id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::unauthorized("session user no longer exists"))
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ports::MockUserRepository;
    use crate::domain::{ErrorCode, Role};
    use crate::test_support::InMemoryLogisticsStore;
    use rstest::{fixture, rstest};

    #[fixture]
    fn directory() -> AccountDirectory<InMemoryLogisticsStore> {
        AccountDirectory::new(Arc::new(InMemoryLogisticsStore::default()))
    }

    fn account(username: &str, role: Option<Role>) -> NewAccount {
        NewAccount::try_new(username, "s3cret!", role).expect("valid account")
    }

    #[rstest]
    #[tokio::test]
    async fn registered_users_can_log_in(directory: AccountDirectory<InMemoryLogisticsStore>) {
        let created = directory
            .create_user(account("clerk", Some(Role::LogisticsOfficer)))
            .await
            .expect("account created");
        let creds = LoginCredentials::try_from_parts("clerk", "s3cret!").expect("credentials");
        let user = directory.authenticate(&creds).await.expect("login succeeds");
        assert_eq!(user, created);
        assert_eq!(user.identity().role(), Role::LogisticsOfficer);
    }

    #[rstest]
    #[case("clerk", "wrong")]
    #[case("nobody", "s3cret!")]
    #[tokio::test]
    async fn bad_credentials_are_unauthorized(
        directory: AccountDirectory<InMemoryLogisticsStore>,
        #[case] username: &str,
        #[case] password: &str,
    ) {
        directory
            .create_user(account("clerk", None))
            .await
            .expect("account created");
        let creds = LoginCredentials::try_from_parts(username, password).expect("credentials");
        let err = directory.authenticate(&creds).await.expect_err("refused");
        assert_eq!(err.code(), ErrorCode::Unauthorized);
        assert_eq!(err.message(), "invalid credentials");
    }

    #[rstest]
    #[tokio::test]
    async fn duplicate_usernames_conflict(directory: AccountDirectory<InMemoryLogisticsStore>) {
        directory
            .create_user(account("clerk", None))
            .await
            .expect("first account");
        let err = directory
            .create_user(account(" clerk ", None))
            .await
            .expect_err("duplicate");
        assert_eq!(err.code(), ErrorCode::Conflict);
        assert_eq!(err.detail_code(), Some("duplicate_entity"));
    }

    #[rstest]
    #[tokio::test]
    async fn missing_session_user_is_unauthorized(
        directory: AccountDirectory<InMemoryLogisticsStore>,
    ) {
        let err = directory
            .current_user(UserId::new(404))
            .await
            .expect_err("no such user");
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }

    #[rstest]
    #[tokio::test]
    async fn connection_failures_are_service_unavailable() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_username()
            .times(1)
            .return_once(|_| Err(UserRepositoryError::connection("refused")));
        let directory = AccountDirectory::new(Arc::new(repo));
        let creds = LoginCredentials::try_from_parts("clerk", "pw").expect("credentials");
        let err = directory.authenticate(&creds).await.expect_err("offline");
        assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
    }
}
