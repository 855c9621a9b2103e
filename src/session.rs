use std::time::Duration;

use reqwest::Method;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use tracing::{debug, warn};

use crate::error::MefError;

pub const SESSION_COOKIE: &str = "JSESSIONID";
pub const XSRF_COOKIE: &str = "XSRF-TOKEN";
pub const XSRF_HEADER: &str = "x-xsrf-token";

pub const JSON: &str = "application/json";
pub const ZIP: &str = "application/zip";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub credentials: Credentials,
    pub timeout: Option<Duration>,
}

/// An authenticated, cookie-carrying connection to one catalog plus its XSRF token.
#[derive(Clone)]
pub struct CatalogSession {
    client: Client,
    api_url: String,
    xsrf_token: Option<String>,
    credentials: Credentials,
}

impl CatalogSession {
    /// Runs the "who am I" handshake against `<base_url>/api` so the server issues its cookies.
    pub fn connect(base_url: &str, options: SessionOptions) -> Result<Self, MefError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("catalog-mef/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| MefError::CatalogHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .timeout(options.timeout)
            .build()
            .map_err(|err| MefError::CatalogHttp(err.to_string()))?;

        let api_url = api_url(base_url);
        let url = format!("{api_url}/info");
        debug!(%url, "session handshake");
        let response = client
            .post(&url)
            .query(&[("type", "me")])
            .header(ACCEPT, JSON)
            .send()
            .map_err(|err| MefError::CatalogHttp(err.to_string()))?;
        if !response.status().is_success() {
            // anonymous callers are often refused here, the cookies still come back
            debug!(status = response.status().as_u16(), "handshake answered with an error");
        }

        let cookies = response
            .cookies()
            .map(|cookie| (cookie.name().to_string(), cookie.value().to_string()))
            .collect::<Vec<_>>();
        match find_cookie(&cookies, SESSION_COOKIE) {
            Some(value) => debug!("{SESSION_COOKIE}={value}"),
            None => debug!("no {SESSION_COOKIE} cookie issued"),
        }
        let xsrf_token = find_cookie(&cookies, XSRF_COOKIE);
        match &xsrf_token {
            Some(value) => debug!("{XSRF_COOKIE}={value}"),
            None => warn!("unable to find the XSRF token, mutating calls may be rejected"),
        }

        Ok(Self {
            client,
            api_url,
            xsrf_token,
            credentials: options.credentials,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn xsrf_token(&self) -> Option<&str> {
        self.xsrf_token.as_deref()
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// A request against `<api>/<path>` carrying the session headers.
    pub(crate) fn request(&self, method: Method, path: &str, accept: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.api_url, path.trim_start_matches('/'));
        debug!(%method, %url, "catalog request");
        self.client
            .request(method, url)
            .headers(session_headers(self.xsrf_token.as_deref(), accept))
    }

    pub(crate) fn authenticated(&self, method: Method, path: &str, accept: &str) -> RequestBuilder {
        self.request(method, path, accept).basic_auth(
            &self.credentials.username,
            Some(&self.credentials.password),
        )
    }
}

/// `<base>/api`, tolerating a trailing slash on the base URL.
pub fn api_url(base_url: &str) -> String {
    format!("{}/api", base_url.trim().trim_end_matches('/'))
}

pub fn find_cookie(cookies: &[(String, String)], name: &str) -> Option<String> {
    cookies
        .iter()
        .find(|(cookie, value)| cookie == name && !value.is_empty())
        .map(|(_, value)| value.clone())
}

/// Headers attached to every call after the handshake.
pub fn session_headers(xsrf_token: Option<&str>, accept: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(accept) {
        headers.insert(ACCEPT, value);
    }
    if let Some(token) = xsrf_token {
        match HeaderValue::from_str(token) {
            Ok(value) => {
                headers.insert(HeaderName::from_static(XSRF_HEADER), value);
            }
            Err(_) => warn!("XSRF token is not a valid header value, not sending it"),
        }
    }
    headers
}
