//! Session helpers that turn the cookie session into a caller identity.
//!
//! Only the user id lives in the cookie. The role is re-read from the
//! account store on every request so role changes and deleted accounts take
//! effect immediately.

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;
use tracing::warn;

use crate::domain::ports::AccountService;
use crate::domain::{CallerIdentity, Error, UserId};

pub(crate) const USER_ID_KEY: &str = "user_id";

/// Request extractor wrapping the Actix session.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    /// Wrap an Actix session.
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Remember the authenticated user and rotate the session id.
    pub fn persist_user(&self, user_id: UserId) -> Result<(), Error> {
        self.0.renew();
        self.0
            .insert(USER_ID_KEY, user_id.value())
            .map_err(|error| Error::internal(format!("failed to persist session: {error}")))
    }

    /// Forget the authenticated user.
    pub fn clear(&self) {
        self.0.purge();
    }

    /// User id stored in the session, if any.
    ///
    /// A value that does not decode is treated as an anonymous session.
    pub fn user_id(&self) -> Result<Option<UserId>, Error> {
        match self.0.get::<i32>(USER_ID_KEY) {
            Ok(id) => Ok(id.map(UserId::new)),
            Err(error) => {
                warn!(%error, "discarding undecodable session user id");
                Ok(None)
            }
        }
    }

    /// Require a logged-in user or fail with `401 Unauthorized`.
    pub fn require_user_id(&self) -> Result<UserId, Error> {
        self.user_id()?
            .ok_or_else(|| Error::unauthorized("login required"))
    }

    /// Resolve the logged-in user's current identity.
    pub async fn require_caller(
        &self,
        accounts: &dyn AccountService,
    ) -> Result<CallerIdentity, Error> {
        let user_id = self.require_user_id()?;
        let user = accounts.current_user(user_id).await?;
        Ok(user.identity())
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}
