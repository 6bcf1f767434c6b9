use super::AuthorizationServer;
use crate::context::ResponseContext;
use crate::error::{ErrorKind, RejectExt, Rejection};
use crate::models::{Grant, Token};
use crate::random::generate_code;
use crate::request::params;
use crate::store::KvStore;
use chrono::Utc;
use log::info;

impl<S: KvStore> AuthorizationServer<S> {
    /// Exchanges `origin` for a new grant carrying a fresh token pair.
    ///
    /// An origin with a code is retired first; losing that race mints
    /// nothing and fails with `InvalidGrant`.
    pub(crate) async fn finalize(
        &self,
        origin: &Grant,
        ctx: &mut ResponseContext,
    ) -> Result<Grant, Rejection> {
        if !origin.code.is_empty() {
            self.repo
                .retire_grant(&origin.code)
                .await
                .reject_lookup(ErrorKind::InvalidGrant)?;
        }

        let length = self.options.code_length;
        let expires_in = self.options.access_expire;

        let mut access = Token::new(
            generate_code(length).reject(ErrorKind::ServerError)?,
            &origin.client_id,
            &origin.user_id,
            expires_in,
        );
        self.repo
            .save_token(&mut access)
            .await
            .reject(ErrorKind::ServerError)?;

        let mut refresh = Token::new(
            generate_code(length).reject(ErrorKind::ServerError)?,
            &origin.client_id,
            &origin.user_id,
            0,
        );
        self.repo
            .save_token(&mut refresh)
            .await
            .reject(ErrorKind::ServerError)?;

        let now = Utc::now();
        let mut grant = Grant {
            code: generate_code(length).reject(ErrorKind::ServerError)?,
            access_token: access.code.clone(),
            refresh_token: refresh.code.clone(),
            expires_in,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            ..origin.clone()
        };
        self.repo
            .save_grant(&mut grant)
            .await
            .reject(ErrorKind::ServerError)?;
        self.repo
            .attach(
                &grant.client_id,
                &grant.user_id,
                &[grant.code.as_str()],
                &[access.code.as_str(), refresh.code.as_str()],
            )
            .await
            .reject(ErrorKind::ServerError)?;

        ctx.insert(params::ACCESS_TOKEN, access.code.as_str());
        ctx.insert(params::TOKEN_TYPE, self.options.token_type.as_str());
        ctx.insert(params::EXPIRES_IN, expires_in);
        ctx.insert(params::REFRESH_TOKEN, refresh.code.as_str());
        if !grant.scope.is_empty() {
            ctx.insert(params::SCOPE, grant.scope.as_str());
        }

        info!(
            "Issued {} tokens to client {} for {}",
            grant.kind.as_str(),
            grant.client_id,
            grant.user_id
        );
        Ok(grant)
    }
}
