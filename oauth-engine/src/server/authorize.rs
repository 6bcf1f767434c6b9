use super::{AuthorizationServer, AuthorizeOutcome, LoginPrompt};
use crate::context::ResponseContext;
use crate::error::{ErrorKind, RejectExt, Rejection};
use crate::models::{Client, Grant, GrantKind, User};
use crate::random::generate_code;
use crate::redirect::{first_uri, validate_uri_list};
use crate::request::{params, query_unescape, OAuthRequest};
use crate::store::KvStore;
use http::Method;
use log::{debug, info};

impl<S: KvStore> AuthorizationServer<S> {
    /// The user-facing authorization step.
    ///
    /// Unauthenticated requests get the login form. Authenticated ones are
    /// answered with a code (`response_type=code`) or tokens in the redirect
    /// fragment (`response_type=token`).
    pub async fn authorize(&self, req: &OAuthRequest) -> AuthorizeOutcome {
        let mut ctx = ResponseContext::new();
        let state = req.param(params::STATE).unwrap_or_default().to_string();
        match self.authorize_flow(req, &state, &mut ctx).await {
            Ok(Some(prompt)) => AuthorizeOutcome::Login(prompt),
            Ok(None) => AuthorizeOutcome::Respond(ctx),
            Err(rejection) => {
                ctx.reject(rejection, &state);
                AuthorizeOutcome::Respond(ctx)
            }
        }
    }

    async fn authorize_flow(
        &self,
        req: &OAuthRequest,
        state: &str,
        ctx: &mut ResponseContext,
    ) -> Result<Option<LoginPrompt>, Rejection> {
        let requested = match req.param(params::REDIRECT_URL) {
            Some(raw) => query_unescape(raw).reject(ErrorKind::InvalidRequest)?,
            None => String::new(),
        };
        let client_id = req.param(params::CLIENT_ID).unwrap_or_default();
        let client = self
            .repo
            .client(client_id)
            .await
            .reject_lookup(ErrorKind::UnauthorizedClient)?;
        if client.redirect_url.is_empty() {
            return Err(Rejection::new(ErrorKind::UnauthorizedClient)
                .with_description("The client has no registered redirect uri."));
        }

        let separator = &self.options.redirect_separator;
        let redirect = if requested.is_empty()
            && first_uri(&client.redirect_url, separator) == client.redirect_url
        {
            client.redirect_url.clone()
        } else {
            requested
        };
        validate_uri_list(&client.redirect_url, &redirect, separator)
            .reject(ErrorKind::InvalidRequest)?;
        ctx.set_redirect(redirect.as_str());

        let Some(user) = self.authenticate_user(req).await else {
            return self.login_prompt(req).map(Some);
        };

        match req.param(params::RESPONSE_TYPE) {
            Some("code") => {
                self.issue_code(req, &client, &user, &redirect, state, ctx)
                    .await?;
            }
            Some("token") => {
                ctx.set_fragment(true);
                let grant = Grant {
                    scope: req.param(params::SCOPE).unwrap_or_default().to_string(),
                    state: state.to_string(),
                    redirect_url: redirect,
                    ..Grant::new(GrantKind::Implicit, &client.id, &user.email)
                };
                self.finalize(&grant, ctx).await?;
                if !state.is_empty() {
                    ctx.insert(params::STATE, state);
                }
            }
            _ => return Err(ErrorKind::UnsupportedResponseType.into()),
        }
        Ok(None)
    }

    /// The login form owner, if the request carries valid credentials
    async fn authenticate_user(&self, req: &OAuthRequest) -> Option<User> {
        if req.method != Method::POST {
            return None;
        }
        let username = req.param(params::LOGIN_USERNAME)?;
        let password = req.param(params::LOGIN_PASSWORD)?;
        if self.options.require_csrf {
            let token = req.param(params::CSRF_TOKEN).unwrap_or_default();
            if !self.csrf.verify(&req.uri, token) {
                debug!("Rejected login form with a missing or stale csrf token");
                return None;
            }
        }
        match self.repo.verify_user(username, password).await {
            Ok(user) => Some(user),
            Err(err) => {
                debug!("Login failed for {username}: {err}");
                None
            }
        }
    }

    fn login_prompt(&self, req: &OAuthRequest) -> Result<LoginPrompt, Rejection> {
        Ok(LoginPrompt {
            action: req.uri.clone(),
            title: self.options.login_title(),
            csrf_token: self.csrf.issue(&req.uri).reject(ErrorKind::ServerError)?,
        })
    }

    async fn issue_code(
        &self,
        req: &OAuthRequest,
        client: &Client,
        user: &User,
        redirect: &str,
        state: &str,
        ctx: &mut ResponseContext,
    ) -> Result<(), Rejection> {
        let mut grant = Grant {
            code: generate_code(self.options.code_length).reject(ErrorKind::ServerError)?,
            scope: req.param(params::SCOPE).unwrap_or_default().to_string(),
            state: state.to_string(),
            redirect_url: redirect.to_string(),
            expires_in: self.options.authorization_expire,
            ..Grant::new(GrantKind::AuthorizationCode, &client.id, &user.email)
        };
        self.repo
            .save_grant(&mut grant)
            .await
            .reject(ErrorKind::ServerError)?;
        self.repo
            .attach(&client.id, &user.email, &[grant.code.as_str()], &[])
            .await
            .reject(ErrorKind::ServerError)?;

        info!("Issued authorization code to client {} for {}", client.id, user.email);
        ctx.insert(params::CODE, grant.code.as_str());
        ctx.insert(params::STATE, state);
        Ok(())
    }
}
