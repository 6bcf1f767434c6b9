use super::{resolve_scope, AuthorizationServer};
use crate::context::ResponseContext;
use crate::credentials::BasicAuth;
use crate::error::{EngineError, ErrorKind, RejectExt, Rejection};
use crate::models::{Client, Grant, GrantKind};
use crate::redirect::{first_uri, validate_uri_list};
use crate::request::{params, OAuthRequest};
use crate::store::KvStore;
use http::Method;

impl<S: KvStore> AuthorizationServer<S> {
    /// The token endpoint. Always answers with JSON data.
    pub async fn access(&self, req: &OAuthRequest) -> ResponseContext {
        let mut ctx = ResponseContext::new();
        if let Err(rejection) = self.access_flow(req, &mut ctx).await {
            ctx.reject(rejection, "");
        }
        ctx
    }

    async fn access_flow(
        &self,
        req: &OAuthRequest,
        ctx: &mut ResponseContext,
    ) -> Result<(), Rejection> {
        let method_allowed = req.method == Method::POST
            || (req.method == Method::GET && self.options.allow_get_access);
        if !method_allowed {
            return Err(Rejection::new(ErrorKind::InvalidRequest)
                .with_cause(EngineError::MethodNotAllowed(req.method.clone())));
        }

        let grant_type = req.param(params::GRANT_TYPE).unwrap_or_default();
        let Some(auth) = BasicAuth::from_request(req, self.options.allow_form_client_credentials)
        else {
            return Err(ErrorKind::InvalidClient.into());
        };
        if !self.options.access_allowed(grant_type) {
            return Err(ErrorKind::UnsupportedGrantType.into());
        }

        match GrantKind::from_grant_type(grant_type) {
            Some(GrantKind::AuthorizationCode) => self.exchange_code(req, &auth, ctx).await,
            Some(GrantKind::RefreshToken) => self.refresh(req, &auth, ctx).await,
            Some(GrantKind::Password) => self.password(req, &auth, ctx).await,
            Some(GrantKind::ClientCredentials) => self.client_credentials(req, &auth, ctx).await,
            Some(GrantKind::Assertion) => self.assertion(req, &auth, ctx).await,
            _ => Err(ErrorKind::UnsupportedGrantType.into()),
        }
    }

    async fn authenticate_client(&self, auth: &BasicAuth) -> Result<Client, Rejection> {
        self.repo
            .verify_client(auth)
            .await
            .reject_lookup(ErrorKind::UnauthorizedClient)
    }

    async fn exchange_code(
        &self,
        req: &OAuthRequest,
        auth: &BasicAuth,
        ctx: &mut ResponseContext,
    ) -> Result<(), Rejection> {
        let code = req
            .param(params::CODE)
            .ok_or(ErrorKind::UnsupportedGrantType)?;
        let client = self.authenticate_client(auth).await?;
        let grant = self
            .repo
            .grant_by_client(&client, code)
            .await
            .reject_lookup(ErrorKind::InvalidGrant)?;
        if grant.kind != GrantKind::AuthorizationCode || grant.has_tokens() {
            return Err(ErrorKind::InvalidGrant.into());
        }
        if grant.is_expired() {
            return Err(Rejection::new(ErrorKind::InvalidGrant).with_cause(EngineError::Expired));
        }

        let separator = &self.options.redirect_separator;
        let redirect = match req.param(params::REDIRECT_URL) {
            Some(requested) => {
                if !grant.redirect_url.is_empty() && requested != grant.redirect_url {
                    return Err(Rejection::new(ErrorKind::InvalidGrant)
                        .with_description("The redirect uri does not match the authorization request."));
                }
                requested.to_string()
            }
            None if !grant.redirect_url.is_empty() => grant.redirect_url.clone(),
            None => first_uri(&client.redirect_url, separator).to_string(),
        };
        validate_uri_list(&client.redirect_url, &redirect, separator)
            .reject(ErrorKind::InvalidRequest)?;

        let exchange = Grant {
            redirect_url: redirect,
            ..grant
        };
        self.finalize(&exchange, ctx).await?;
        Ok(())
    }

    async fn refresh(
        &self,
        req: &OAuthRequest,
        auth: &BasicAuth,
        ctx: &mut ResponseContext,
    ) -> Result<(), Rejection> {
        let refresh_token = req
            .param(params::REFRESH_TOKEN)
            .ok_or(ErrorKind::InvalidGrant)?;
        let client = self.authenticate_client(auth).await?;
        let grant = self
            .repo
            .grant_by_refresh(refresh_token)
            .await
            .reject_lookup(ErrorKind::InvalidGrant)?;
        if grant.client_id != client.id {
            return Err(Rejection::new(ErrorKind::UnauthorizedClient)
                .with_cause(EngineError::Ownership));
        }

        let requested = req.param(params::SCOPE).unwrap_or_default();
        let scope = resolve_scope(&grant.scope, requested).ok_or_else(|| {
            Rejection::new(ErrorKind::AccessDenied)
                .with_description("The requested scope exceeds the original grant.")
        })?;

        let renewal = Grant {
            kind: GrantKind::RefreshToken,
            scope,
            ..grant
        };
        self.finalize(&renewal, ctx).await?;
        Ok(())
    }

    async fn password(
        &self,
        req: &OAuthRequest,
        auth: &BasicAuth,
        ctx: &mut ResponseContext,
    ) -> Result<(), Rejection> {
        let (Some(username), Some(password)) =
            (req.param(params::USERNAME), req.param(params::PASSWORD))
        else {
            return Err(ErrorKind::InvalidGrant.into());
        };
        let user = self
            .repo
            .verify_user(username, password)
            .await
            .reject_lookup(ErrorKind::InvalidGrant)?;
        let client = self.authenticate_client(auth).await?;

        let grant = Grant {
            scope: req.param(params::SCOPE).unwrap_or_default().to_string(),
            ..Grant::new(GrantKind::Password, &client.id, &user.email)
        };
        self.finalize(&grant, ctx).await?;
        Ok(())
    }

    async fn client_credentials(
        &self,
        req: &OAuthRequest,
        auth: &BasicAuth,
        ctx: &mut ResponseContext,
    ) -> Result<(), Rejection> {
        let client = self.authenticate_client(auth).await?;
        let grant = Grant {
            scope: req.param(params::SCOPE).unwrap_or_default().to_string(),
            ..Grant::new(GrantKind::ClientCredentials, &client.id, &client.user_id)
        };
        self.finalize(&grant, ctx).await?;
        Ok(())
    }

    async fn assertion(
        &self,
        req: &OAuthRequest,
        auth: &BasicAuth,
        ctx: &mut ResponseContext,
    ) -> Result<(), Rejection> {
        if req.param(params::ASSERTION_TYPE).is_none() || req.param(params::ASSERTION).is_none() {
            return Err(ErrorKind::InvalidGrant.into());
        }
        let client = self.authenticate_client(auth).await?;
        let grant = Grant {
            scope: req.param(params::SCOPE).unwrap_or_default().to_string(),
            redirect_url: first_uri(&client.redirect_url, &self.options.redirect_separator)
                .to_string(),
            ..Grant::new(GrantKind::Assertion, &client.id, &client.user_id)
        };
        self.finalize(&grant, ctx).await?;
        Ok(())
    }
}
