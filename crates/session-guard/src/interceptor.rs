//! Request interceptor: CSRF attachment and multipart header cleanup.

use crate::cookie::CookieAccessor;
use crate::descriptor::{AuthenticationMode, RequestDescriptor};
use crate::{ClientError, ClientResult};
use carebridge_config::ClientConfig;
use reqwest::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use tracing::{debug, warn};

/// Transforms outgoing descriptors before dispatch. No I/O.
#[derive(Clone)]
pub struct RequestInterceptor {
    cookies: CookieAccessor,
    csrf_cookie: String,
    csrf_header: HeaderName,
}

impl RequestInterceptor {
    pub fn new(cookies: CookieAccessor, config: &ClientConfig) -> ClientResult<Self> {
        let csrf_header = HeaderName::from_bytes(config.csrf_header.as_bytes()).map_err(|e| {
            ClientError::InvalidRequest(format!(
                "Invalid CSRF header name {:?}: {}",
                config.csrf_header, e
            ))
        })?;

        Ok(Self {
            cookies,
            csrf_cookie: config.csrf_cookie.clone(),
            csrf_header,
        })
    }

    /// Prepare a descriptor for dispatch.
    ///
    /// - Cookie-session mutating requests get the CSRF header from the
    ///   current cookie value; a missing cookie is not an error.
    /// - Bearer requests never carry the CSRF header.
    /// - Multipart bodies lose any forced `Content-Type` so the transport can
    ///   write the boundary.
    pub fn prepare(&self, mut request: RequestDescriptor) -> RequestDescriptor {
        match request.auth_mode() {
            AuthenticationMode::BearerToken => {
                if request.headers.remove(&self.csrf_header).is_some() {
                    debug!(
                        method = %request.method(),
                        path = %request.path(),
                        "Dropped CSRF header from bearer request"
                    );
                }
            }
            AuthenticationMode::CookieSession if request.method().is_mutating() => {
                match self.cookies.read(&self.csrf_cookie) {
                    Some(token) => match HeaderValue::from_str(&token) {
                        Ok(value) => {
                            request.headers.insert(self.csrf_header.clone(), value);
                        }
                        Err(_) => {
                            warn!(
                                cookie = %self.csrf_cookie,
                                "CSRF cookie is not a valid header value, sending without it"
                            );
                        }
                    },
                    None => {
                        debug!(
                            method = %request.method(),
                            path = %request.path(),
                            "No CSRF cookie present, sending without token"
                        );
                    }
                }
            }
            AuthenticationMode::CookieSession => {}
        }

        if request.body().is_multipart() && request.headers.remove(CONTENT_TYPE).is_some() {
            debug!(path = %request.path(), "Removed forced Content-Type from multipart request");
        }

        request
    }
}
