use chrono::{DateTime, TimeZone, Utc};
use http::header::{CACHE_CONTROL, EXPIRES, PRAGMA};
use http::{HeaderMap, HeaderValue};
use log::warn;

/// Cache-Control directives
#[derive(Debug, Clone, Default)]
pub struct CacheControl {
    pub no_cache: bool,
    pub no_store: bool,
    pub must_revalidate: bool,
    pub max_age: Option<u32>,
}

impl CacheControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_cache(mut self) -> Self {
        self.no_cache = true;
        self
    }

    pub fn no_store(mut self) -> Self {
        self.no_store = true;
        self
    }

    pub fn must_revalidate(mut self) -> Self {
        self.must_revalidate = true;
        self
    }

    pub fn max_age(mut self, seconds: u32) -> Self {
        self.max_age = Some(seconds);
        self
    }

    /// Convert to HeaderValue
    pub fn to_header_value(&self) -> HeaderValue {
        let mut parts = Vec::new();

        if self.no_cache {
            parts.push("no-cache".to_string());
        }
        if self.no_store {
            parts.push("no-store".to_string());
        }
        if let Some(max_age) = self.max_age {
            parts.push(format!("max-age={max_age}"));
        }
        if self.must_revalidate {
            parts.push("must-revalidate".to_string());
        }

        HeaderValue::from_str(&parts.join(", ")).unwrap_or(HeaderValue::from_static(""))
    }
}

/// Helper struct for setting cache-related headers
#[derive(Debug, Clone, Default)]
pub struct CacheHeaders {
    cache_control: CacheControl,
    expires: Option<DateTime<Utc>>,
}

impl CacheHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_control(mut self, cache_control: CacheControl) -> Self {
        self.cache_control = cache_control;
        self
    }

    pub fn expires(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    /// Apply headers to a header map
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(CACHE_CONTROL, self.cache_control.to_header_value());

        if self.cache_control.no_cache {
            headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        }

        if let Some(expires) = self.expires {
            let http_date = expires.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
            match HeaderValue::from_str(&http_date) {
                Ok(value) => {
                    headers.insert(EXPIRES, value);
                }
                Err(e) => warn!("failed to set expires header: {e}"),
            }
        } else if self.cache_control.no_store || self.cache_control.no_cache {
            headers.insert(EXPIRES, HeaderValue::from_static("0"));
        }
    }
}

pub mod presets {
    use super::*;

    /// Headers for every protocol response: nothing may be cached
    pub fn no_store() -> CacheHeaders {
        let headers = CacheHeaders::new().cache_control(
            CacheControl::new()
                .no_cache()
                .no_store()
                .max_age(0)
                .must_revalidate(),
        );
        match Utc.with_ymd_and_hms(1990, 1, 1, 0, 0, 0).single() {
            Some(past) => headers.expires(past),
            None => headers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_store_preset() {
        let mut headers = HeaderMap::new();
        presets::no_store().apply(&mut headers);

        assert_eq!(
            headers.get(CACHE_CONTROL).unwrap(),
            "no-cache, no-store, max-age=0, must-revalidate"
        );
        assert_eq!(headers.get(PRAGMA).unwrap(), "no-cache");
        assert_eq!(headers.get(EXPIRES).unwrap(), "Mon, 01 Jan 1990 00:00:00 GMT");
    }

    #[test]
    fn test_expires_zero_without_date() {
        let mut headers = HeaderMap::new();
        CacheHeaders::new()
            .cache_control(CacheControl::new().no_store())
            .apply(&mut headers);
        assert_eq!(headers.get(EXPIRES).unwrap(), "0");
        assert!(headers.get(PRAGMA).is_none());
    }
}
