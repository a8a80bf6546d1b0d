//! Outgoing request descriptor.
//!
//! A [`RequestDescriptor`] is owned by exactly one in-flight call and moves
//! through the pipeline by value. Its `already_retried` flag is the retry
//! budget for that call: it flips once and is never reset.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use serde::Serialize;
use std::fmt;

/// HTTP verbs supported by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// State-changing verbs carry the CSRF header under a cookie session.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Method::Get)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// How a request authenticates, derived from its headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationMode {
    /// An `Authorization: Bearer …` header is present.
    BearerToken,
    /// Ambient session cookies.
    CookieSession,
}

/// One part of a multipart payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl MultipartPart {
    /// Plain text field.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_name: None,
            content_type: None,
            data: value.into().into_bytes(),
        }
    }

    /// File field.
    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: Option<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            file_name: Some(file_name.into()),
            content_type,
            data,
        }
    }
}

/// Request payload.
///
/// Multipart parts are kept as owned data (not a transport form) so a
/// replay can send them again.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Body {
    #[default]
    Empty,
    Json(serde_json::Value),
    Bytes(Vec<u8>),
    Multipart(Vec<MultipartPart>),
}

impl Body {
    /// Serialize any value into a JSON body.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Body::Json(serde_json::to_value(value)?))
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self, Body::Multipart(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }
}

/// One outgoing call.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    path: String,
    pub(crate) headers: HeaderMap,
    query: Vec<(String, String)>,
    body: Body,
    already_retried: bool,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: Body::Empty,
            already_retried: false,
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Whether this call has already spent its refresh-and-replay cycle.
    pub fn already_retried(&self) -> bool {
        self.already_retried
    }

    /// Spend the retry budget. There is no way back.
    pub(crate) fn mark_retried(&mut self) {
        self.already_retried = true;
    }

    /// Classify how this request authenticates.
    pub fn auth_mode(&self) -> AuthenticationMode {
        let bearer = self
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(|value| {
                value
                    .trim_start()
                    .get(..7)
                    .is_some_and(|scheme| scheme.eq_ignore_ascii_case("bearer "))
            })
            .unwrap_or(false);

        if bearer {
            AuthenticationMode::BearerToken
        } else {
            AuthenticationMode::CookieSession
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_get_is_read_only() {
        assert!(!Method::Get.is_mutating());
        assert!(Method::Post.is_mutating());
        assert!(Method::Put.is_mutating());
        assert!(Method::Patch.is_mutating());
        assert!(Method::Delete.is_mutating());
    }

    #[test]
    fn test_auth_mode_defaults_to_cookie_session() {
        let request = RequestDescriptor::new(Method::Get, "/activities");
        assert_eq!(request.auth_mode(), AuthenticationMode::CookieSession);
    }

    #[test]
    fn test_auth_mode_detects_bearer_case_insensitively() {
        let request = RequestDescriptor::new(Method::Post, "/media")
            .with_header(AUTHORIZATION, HeaderValue::from_static("bearer abc.def"));
        assert_eq!(request.auth_mode(), AuthenticationMode::BearerToken);
    }

    #[test]
    fn test_non_bearer_authorization_is_cookie_session() {
        let request = RequestDescriptor::new(Method::Post, "/media")
            .with_header(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwdw=="));
        assert_eq!(request.auth_mode(), AuthenticationMode::CookieSession);
    }

    #[test]
    fn test_retry_flag_only_moves_forward() {
        let mut request = RequestDescriptor::new(Method::Delete, "/ratings/4");
        assert!(!request.already_retried());
        request.mark_retried();
        request.mark_retried();
        assert!(request.already_retried());
    }

    #[test]
    fn test_body_helpers() {
        let body = Body::json(&serde_json::json!({ "name": "Nap time" })).unwrap();
        assert!(!body.is_multipart());
        assert!(!body.is_empty());
        assert!(Body::Multipart(vec![MultipartPart::text("caption", "Snack")]).is_multipart());
        assert!(Body::default().is_empty());
    }
}
