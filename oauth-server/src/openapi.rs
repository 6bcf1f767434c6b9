use crate::api::{health, oauth};
use utoipa::OpenApi;

pub(crate) const HEALTH_TAG: &str = "Health API";
pub(crate) const OAUTH_TAG: &str = "OAuth2 API";

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::ready_check,
        oauth::handlers::authorize,
        oauth::handlers::token,
        oauth::handlers::info,
    ),
    tags(
        (name = HEALTH_TAG, description = "Health check endpoints"),
        (name = OAUTH_TAG, description = "Authorization, token and introspection endpoints"),
    ),
    info(
        title = "OAuth2 authorization server",
        description = "Embedded OAuth2 authorization server",
        version = "0.1.0"
    )
)]
pub(crate) struct ApiDoc;
