//! Credential extraction.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hermes_core::{InboundCall, UsernameToken};
use http::header::{HeaderValue, InvalidHeaderValue, AUTHORIZATION};
use std::fmt;

/// A username and password pair presented by a caller.
///
/// Both parts are always non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    username: String,
    password: String,
}

impl BasicCredentials {
    /// Creates credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the user name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Finds the credentials a call presents.
    ///
    /// The `Authorization` header wins over the message security token. A
    /// header that cannot be decoded counts as absent.
    #[must_use]
    pub fn extract(call: &InboundCall) -> Option<Self> {
        call.headers()
            .get_all(AUTHORIZATION)
            .iter()
            .find_map(Self::from_authorization)
            .or_else(|| call.security_token().and_then(Self::from_token))
    }

    /// Decodes an `Authorization: Basic` header value.
    #[must_use]
    pub fn from_authorization(value: &HeaderValue) -> Option<Self> {
        let (scheme, encoded) = value.to_str().ok()?.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        Self::checked(username, password)
    }

    /// Reads a message security token.
    #[must_use]
    pub fn from_token(token: &UsernameToken) -> Option<Self> {
        Self::checked(&token.username, token.password.as_deref()?)
    }

    /// Encodes the credentials as an `Authorization: Basic` header value.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoded value is not a valid header value.
    pub fn to_authorization(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        let encoded = STANDARD.encode(format!("{}:{}", self.username, self.password));
        HeaderValue::from_str(&format!("Basic {encoded}"))
    }

    fn checked(username: &str, password: &str) -> Option<Self> {
        (!username.is_empty() && !password.is_empty()).then(|| Self::new(username, password))
    }
}

impl fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
