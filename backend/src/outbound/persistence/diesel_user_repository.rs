//! PostgreSQL-backed `UserRepository`.
//!
//! Passwords are stored as Argon2id PHC strings; rows whose username or role
//! code no longer validates surface as query errors.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{StoredUser, UserRepository, UserRepositoryError};
use crate::domain::{PasswordDigest, Role, User, UserId, Username};

use super::diesel_basic_error_mapping::{
    map_basic_diesel_error, map_basic_pool_error, unique_violation,
};
use super::models::{NewUserRow, UserRow};
use super::pool::{DbPool, PoolError};
use super::schema::users;

/// Diesel-backed implementation of the `UserRepository` port.
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> UserRepositoryError {
    map_basic_pool_error(error, UserRepositoryError::connection)
}

fn map_diesel_error(error: DieselError) -> UserRepositoryError {
    map_basic_diesel_error(
        error,
        UserRepositoryError::query,
        UserRepositoryError::connection,
    )
}

fn decode(row: UserRow) -> Result<StoredUser, UserRepositoryError> {
    let user_pk = row.user_pk;
    let (user, password) = row.into_parts().map_err(|err| {
        UserRepositoryError::query(format!("user {user_pk} has invalid stored data: {err}"))
    })?;
    Ok(StoredUser { user, password })
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn insert(
        &self,
        username: &Username,
        password: &PasswordDigest,
        role: Role,
    ) -> Result<User, UserRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: UserRow = diesel::insert_into(users::table)
            .values(NewUserRow {
                username: username.as_str(),
                password: password.as_phc(),
                role_fk: role.code(),
            })
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(|error| {
                if unique_violation(&error).is_some() {
                    UserRepositoryError::duplicate_username(username.as_str())
                } else {
                    map_diesel_error(error)
                }
            })?;
        decode(row).map(|stored| stored.user)
    }

    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<StoredUser>, UserRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<UserRow> = users::table
            .filter(users::username.eq(username.as_str()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(decode).transpose()
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<UserRow> = users::table
            .find(id.value())
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(decode).transpose()?.map(|stored| stored.user))
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for user row decoding.
    use super::*;
    use rstest::rstest;

    fn row(username: &str, role_fk: i32) -> UserRow {
        UserRow {
            user_pk: 5,
            username: username.to_owned(),
            password: "$argon2id$v=19$stub".to_owned(),
            role_fk,
        }
    }

    #[rstest]
    fn valid_rows_decode() {
        let stored = decode(row("clerk", 2)).expect("valid row");
        assert_eq!(stored.user.id, UserId::new(5));
        assert_eq!(stored.user.role, Role::LogisticsOfficer);
        assert_eq!(stored.password.as_phc(), "$argon2id$v=19$stub");
    }

    #[rstest]
    #[case("clerk", 0)]
    #[case("   ", 1)]
    fn corrupt_rows_are_query_errors(#[case] username: &str, #[case] role_fk: i32) {
        let err = decode(row(username, role_fk)).expect_err("corrupt row");
        assert!(matches!(err, UserRepositoryError::Query { .. }));
        assert!(err.to_string().contains("user 5"));
    }
}
