//! Session identity and the account screens' request logic.
//!
//! The service authenticates with a cookie issued by `/login`. We keep that
//! cookie in the system keyring so every credential-bearing request can
//! attach it, and drop it on logout.

use std::error::Error;
use std::fmt;

use keyring::Entry;
use tracing::{debug, info};

use crate::api::client::{ApiError, ServiceClient};

const KEYRING_SERVICE: &str = "devochat";

pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
const EXPIRED_MARKER: (&str, &str) = ("expired", "true");

pub const MISSING_FIELDS_MESSAGE: &str = "Please fill in all fields.";
pub const INVALID_EMAIL_MESSAGE: &str = "Please enter a valid email format.";
pub const PASSWORD_LENGTH_MESSAGE: &str = "Password must be between 8 and 20 characters.";
pub const EXPIRED_NOTICE: &str = "Please log in again.";

/// Opaque session identity. Debug output never shows the value.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

#[derive(Debug)]
pub enum AuthError {
    /// Local input was rejected before any request was made.
    Validation(&'static str),
    Remote(ApiError),
    /// The service accepted the credentials but issued no session cookie.
    MissingSession,
    Keyring(keyring::Error),
}

impl AuthError {
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Validation(message) => (*message).to_string(),
            AuthError::Remote(err) => err.user_message(),
            AuthError::MissingSession => "The service did not issue a session.".to_string(),
            AuthError::Keyring(err) => format!("Could not access the system keyring: {err}"),
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl Error for AuthError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AuthError::Remote(err) => Some(err),
            AuthError::Keyring(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ApiError> for AuthError {
    fn from(err: ApiError) -> Self {
        AuthError::Remote(err)
    }
}

impl From<keyring::Error> for AuthError {
    fn from(err: keyring::Error) -> Self {
        AuthError::Keyring(err)
    }
}

/// Keyring-backed storage for the session identity.
pub struct SessionVault {
    account: String,
    use_keyring: bool,
}

impl SessionVault {
    /// One vault per service base URL, so switching servers never leaks a cookie.
    pub fn new(base_url: &str) -> Self {
        Self::new_with_keyring(base_url, true)
    }

    /// Construct a vault, optionally disabling keyring access (useful for tests)
    pub fn new_with_keyring(base_url: &str, use_keyring: bool) -> Self {
        Self {
            account: format!("session:{}", base_url.trim_end_matches('/')),
            use_keyring,
        }
    }

    pub fn load(&self) -> Result<Option<SessionToken>, AuthError> {
        if !self.use_keyring {
            return Ok(None);
        }
        let entry = Entry::new(KEYRING_SERVICE, &self.account)?;
        match entry.get_password() {
            Ok(value) => Ok(Some(SessionToken::new(value))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub fn store(&self, token: &SessionToken) -> Result<(), AuthError> {
        if !self.use_keyring {
            return Ok(());
        }
        let entry = Entry::new(KEYRING_SERVICE, &self.account)?;
        entry.set_password(token.expose())?;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), AuthError> {
        if !self.use_keyring {
            return Ok(());
        }
        let entry = Entry::new(KEYRING_SERVICE, &self.account)?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Loose `something@something.something` check, whitespace-free.
pub fn is_valid_email(email: &str) -> bool {
    email.split_whitespace().any(|token| {
        let chars: Vec<char> = token.chars().collect();
        chars.iter().enumerate().any(|(at, ch)| {
            if *ch != '@' || at == 0 {
                return false;
            }
            let domain = &chars[at + 1..];
            domain.len() >= 3 && domain[1..domain.len() - 1].contains(&'.')
        })
    })
}

pub fn validate_login(email: &str, password: &str) -> Result<(), AuthError> {
    if email.is_empty() || password.is_empty() {
        return Err(AuthError::Validation(MISSING_FIELDS_MESSAGE));
    }
    if !is_valid_email(email) {
        return Err(AuthError::Validation(INVALID_EMAIL_MESSAGE));
    }
    Ok(())
}

pub fn validate_registration(name: &str, email: &str, password: &str) -> Result<(), AuthError> {
    if name.is_empty() || email.is_empty() || password.is_empty() {
        return Err(AuthError::Validation(MISSING_FIELDS_MESSAGE));
    }
    if !is_valid_email(email) {
        return Err(AuthError::Validation(INVALID_EMAIL_MESSAGE));
    }
    let length = password.chars().count();
    if !(8..=20).contains(&length) {
        return Err(AuthError::Validation(PASSWORD_LENGTH_MESSAGE));
    }
    Ok(())
}

pub async fn login(
    client: &ServiceClient,
    vault: &SessionVault,
    email: &str,
    password: &str,
) -> Result<SessionToken, AuthError> {
    validate_login(email, password)?;
    let token = client
        .login(email, password)
        .await?
        .ok_or(AuthError::MissingSession)?;
    vault.store(&token)?;
    info!("logged in");
    Ok(token)
}

pub async fn register(
    client: &ServiceClient,
    name: &str,
    email: &str,
    password: &str,
) -> Result<(), AuthError> {
    validate_registration(name, email, password)?;
    client.register(name, email, password).await?;
    info!("account created");
    Ok(())
}

pub fn logout(vault: &SessionVault) -> Result<(), AuthError> {
    vault.clear()?;
    debug!("session cleared");
    Ok(())
}

/// Whether `location` already points at one of the account screens.
pub fn is_auth_screen(location: &str) -> bool {
    let path = location.split(['?', '#']).next().unwrap_or_default();
    path.contains(LOGIN_PATH) || path.contains(REGISTER_PATH)
}

/// Target used when a session-bearing call reports the session expired.
pub fn expired_login_target() -> String {
    format!("{LOGIN_PATH}?{}={}", EXPIRED_MARKER.0, EXPIRED_MARKER.1)
}

/// Consumes the expired marker. Returns the notice to show, if any, and the
/// address to display afterwards (the query is dropped once the marker is seen).
pub fn take_expired_notice(location: &str) -> (Option<&'static str>, String) {
    let (path, query) = match location.split_once('?') {
        Some((path, query)) => (path, query),
        None => return (None, location.to_string()),
    };
    let query = query.split('#').next().unwrap_or_default();
    let expired = query.split('&').any(|pair| {
        pair.split_once('=')
            .is_some_and(|(key, value)| key == EXPIRED_MARKER.0 && value == EXPIRED_MARKER.1)
    });
    if expired {
        (Some(EXPIRED_NOTICE), path.to_string())
    } else {
        (None, location.to_string())
    }
}
