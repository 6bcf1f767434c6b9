use super::AuthorizationServer;
use crate::context::ResponseContext;
use crate::credentials::BearerAuth;
use crate::error::{EngineError, ErrorKind, RejectExt, Rejection};
use crate::request::{params, OAuthRequest};
use crate::store::KvStore;

impl<S: KvStore> AuthorizationServer<S> {
    /// Bearer token introspection. Only the `email` scope is answered.
    pub async fn info(&self, req: &OAuthRequest) -> ResponseContext {
        let mut ctx = ResponseContext::new();
        if let Err(rejection) = self.info_flow(req, &mut ctx).await {
            ctx.reject(rejection, "");
        }
        ctx
    }

    async fn info_flow(
        &self,
        req: &OAuthRequest,
        ctx: &mut ResponseContext,
    ) -> Result<(), Rejection> {
        let bearer = BearerAuth::from_request(req).ok_or(ErrorKind::InvalidRequest)?;

        let grant = self
            .repo
            .grant_by_access(&bearer.code)
            .await
            .reject_lookup(ErrorKind::InvalidGrant)?;
        self.repo
            .token(&bearer.code)
            .await
            .reject_lookup(ErrorKind::InvalidGrant)?;
        let client = self
            .repo
            .client(&grant.client_id)
            .await
            .reject_lookup(ErrorKind::UnauthorizedClient)?;
        if !client.owns_grant(&grant.code) {
            return Err(Rejection::new(ErrorKind::InvalidGrant).with_cause(EngineError::Ownership));
        }
        if grant.is_expired() {
            return Err(Rejection::new(ErrorKind::InvalidGrant).with_cause(EngineError::Expired));
        }
        let user = self
            .repo
            .user(&grant.user_id)
            .await
            .reject_lookup(ErrorKind::InvalidGrant)?;

        match grant.scope.as_str() {
            params::EMAIL => {
                ctx.insert(params::EMAIL, user.email);
                Ok(())
            }
            _ => Err(Rejection::new(ErrorKind::InvalidGrant)
                .with_description("Only the email scope can be introspected.")),
        }
    }
}
