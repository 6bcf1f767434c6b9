//! Redirect URI allow-list validation.

use percent_encoding::percent_decode_str;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RedirectError {
    #[error("urls can not be blank")]
    Blank,
    #[error("url must not include fragment")]
    Fragment,
    #[error("scheme mismatch: {base} / {redirect}")]
    SchemeMismatch { base: String, redirect: String },
    #[error("host mismatch: {base} / {redirect}")]
    HostMismatch { base: String, redirect: String },
    #[error("path {redirect} is not a subpath of {base}")]
    NotSubpath { base: String, redirect: String },
    #[error("path {0} contains a traversal segment")]
    Traversal(String),
    #[error("failed to parse {url}: {reason}")]
    Parse { url: String, reason: String },
    #[error("{redirect} does not match any registered uri")]
    NoMatch { redirect: String },
}

/// Splits a registered value into its candidate URIs.
///
/// Without a separator the whole value is the only candidate.
pub fn candidates<'a>(base: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        vec![base]
    } else {
        base.split(separator).collect()
    }
}

/// The first registered URI
pub fn first_uri<'a>(base: &'a str, separator: &str) -> &'a str {
    if separator.is_empty() {
        return base;
    }
    base.split(separator).next().unwrap_or(base)
}

/// Validates `redirect` against every candidate of `base`, succeeding on the
/// first match.
pub fn validate_uri_list(base: &str, redirect: &str, separator: &str) -> Result<(), RedirectError> {
    let mut last = None;
    for candidate in candidates(base, separator) {
        match validate_uri(candidate, redirect) {
            Ok(()) => return Ok(()),
            Err(err) => last = Some(err),
        }
    }
    match last {
        // A single candidate reports its own reason
        Some(err) if separator.is_empty() => Err(err),
        _ => Err(RedirectError::NoMatch {
            redirect: redirect.to_string(),
        }),
    }
}

/// Checks that `redirect` equals `base` or is a traversal-free subpath of it,
/// on the same scheme and host.
pub fn validate_uri(base: &str, redirect: &str) -> Result<(), RedirectError> {
    if base.is_empty() || redirect.is_empty() {
        return Err(RedirectError::Blank);
    }
    let base_url = parse(base)?;
    let redirect_url = parse(redirect)?;

    if has_fragment(&base_url) || has_fragment(&redirect_url) {
        return Err(RedirectError::Fragment);
    }
    if base_url.scheme() != redirect_url.scheme() {
        return Err(RedirectError::SchemeMismatch {
            base: base_url.scheme().to_string(),
            redirect: redirect_url.scheme().to_string(),
        });
    }
    if authority(&base_url) != authority(&redirect_url) {
        return Err(RedirectError::HostMismatch {
            base: authority(&base_url),
            redirect: authority(&redirect_url),
        });
    }
    // Parsing folds dot segments away, so they are looked for in the raw input
    let raw = raw_path(redirect);
    if has_traversal(raw) {
        return Err(RedirectError::Traversal(raw.to_string()));
    }

    let base_path = base_url.path();
    let redirect_path = redirect_url.path();
    if base_path == redirect_path {
        return Ok(());
    }

    let prefix = if base_path.ends_with('/') {
        base_path.to_string()
    } else {
        format!("{base_path}/")
    };
    let Some(rest) = redirect_path.strip_prefix(prefix.as_str()) else {
        return Err(RedirectError::NotSubpath {
            base: base_path.to_string(),
            redirect: redirect_path.to_string(),
        });
    };
    if has_traversal(rest) {
        return Err(RedirectError::Traversal(redirect_path.to_string()));
    }
    Ok(())
}

fn parse(raw: &str) -> Result<Url, RedirectError> {
    Url::parse(raw).map_err(|err| RedirectError::Parse {
        url: raw.to_string(),
        reason: err.to_string(),
    })
}

fn has_fragment(url: &Url) -> bool {
    url.fragment().is_some_and(|fragment| !fragment.is_empty())
}

/// The path of `raw` as written, before any normalization.
fn raw_path(raw: &str) -> &str {
    let after_scheme = raw.split_once("://").map_or(raw, |(_, rest)| rest);
    let path = after_scheme
        .find(['/', '?', '#', '\\'])
        .map_or("", |start| &after_scheme[start..]);
    path.find(['?', '#']).map_or(path, |end| &path[..end])
}

fn has_traversal(path: &str) -> bool {
    path.split(['/', '\\'])
        .any(|segment| percent_decode_str(segment).decode_utf8_lossy() == "..")
}

/// Host and effective port, so an explicit default port equals an omitted one.
fn authority(url: &Url) -> String {
    match (url.host_str(), url.port_or_known_default()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        _ => String::new(),
    }
}
