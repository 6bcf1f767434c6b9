//! Per-request response builder shared by every flow.

use crate::error::{EngineError, ErrorKind, Rejection};
use crate::headers::presets;
use crate::request::params;
use http::header::{CONTENT_TYPE, LOCATION};
use http::{HeaderMap, HeaderValue, Response, StatusCode};
use log::{error, warn};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// JSON body
    Data,
    /// 302 to the redirect target, data encoded as parameters
    Redirect,
}

/// Collects the outcome of one protocol request and renders it once.
#[derive(Debug)]
pub struct ResponseContext {
    kind: ResponseKind,
    status: StatusCode,
    url: String,
    data: Map<String, Value>,
    headers: HeaderMap,
    error: Option<ErrorKind>,
    internal_error: Option<EngineError>,
    fragment: bool,
}

impl Default for ResponseContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseContext {
    pub fn new() -> Self {
        let mut headers = HeaderMap::new();
        presets::no_store().apply(&mut headers);
        Self {
            kind: ResponseKind::Data,
            status: StatusCode::OK,
            url: String::new(),
            data: Map::new(),
            headers,
            error: None,
            internal_error: None,
            fragment: false,
        }
    }

    pub fn kind(&self) -> ResponseKind {
        self.kind
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn error(&self) -> Option<ErrorKind> {
        self.error
    }

    pub fn internal_error(&self) -> Option<&EngineError> {
        self.internal_error.as_ref()
    }

    /// Effective HTTP status. Errors delivered as data follow their kind.
    pub fn status(&self) -> StatusCode {
        match (self.kind, self.error) {
            (ResponseKind::Redirect, _) => StatusCode::FOUND,
            (ResponseKind::Data, Some(kind)) => kind.status_code(),
            (ResponseKind::Data, None) => self.status,
        }
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.data.insert(key.to_string(), value.into());
    }

    /// Switches to a redirect response targeting `url`
    pub fn set_redirect(&mut self, url: impl Into<String>) {
        self.kind = ResponseKind::Redirect;
        self.url = url.into();
    }

    /// Encode redirect parameters in the fragment instead of the query
    pub fn set_fragment(&mut self, fragment: bool) {
        self.fragment = fragment;
    }

    /// Replaces any payload with the standard error fields
    pub fn set_error(&mut self, kind: ErrorKind, description: Option<&str>, uri: &str, state: &str) {
        self.data.clear();
        self.error = Some(kind);
        self.insert(params::ERROR, kind.code());
        self.insert(
            params::ERROR_DESCRIPTION,
            description.unwrap_or(kind.description()),
        );
        self.insert(params::ERROR_URI, uri);
        if !state.is_empty() {
            self.insert(params::STATE, state);
        }
    }

    pub fn set_internal_error(&mut self, err: EngineError) {
        self.internal_error = Some(err);
    }

    /// Folds a flow rejection into the context
    pub fn reject(&mut self, rejection: Rejection, state: &str) {
        self.set_error(rejection.kind, rejection.description.as_deref(), "", state);
        if let Some(cause) = rejection.cause {
            self.set_internal_error(cause);
        }
    }

    /// The redirect target with every data field encoded onto it
    pub fn redirect_url(&self) -> Result<String, EngineError> {
        let mut link = Url::parse(&self.url)?;

        let mut pairs: BTreeMap<String, String> = link.query_pairs().into_owned().collect();
        for (key, value) in &self.data {
            pairs.insert(key.clone(), plain(value));
        }
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&pairs)
            .finish();

        if self.fragment {
            link.set_query(None);
            link.set_fragment(Some(&encoded));
        } else if encoded.is_empty() {
            link.set_query(None);
        } else {
            link.set_query(Some(&encoded));
        }
        Ok(link.into())
    }

    /// Renders the context. The internal cause, if any, is logged here.
    pub fn commit(self) -> Result<Response<String>, EngineError> {
        if let Some(cause) = &self.internal_error {
            match self.error {
                Some(ErrorKind::ServerError) => error!("{}: {}", ErrorKind::ServerError, cause),
                Some(kind) => warn!("{kind}: {cause}"),
                None => warn!("{cause}"),
            }
        }

        let status = self.status();
        let (body, extra) = match self.kind {
            ResponseKind::Redirect => {
                let link = self.redirect_url()?;
                let location =
                    HeaderValue::from_str(&link).map_err(|e| EngineError::Decode(e.to_string()))?;
                (String::new(), (LOCATION, location))
            }
            ResponseKind::Data => (
                serde_json::to_string(&self.data)?,
                (CONTENT_TYPE, HeaderValue::from_static("application/json")),
            ),
        };

        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = self.headers;
        response.headers_mut().insert(extra.0, extra.1);
        Ok(response)
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
