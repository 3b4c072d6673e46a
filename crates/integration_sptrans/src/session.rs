//! Authenticated session against the Olho Vivo API
//!
//! The upstream issues a session cookie from `POST /Login/Autenticar` and
//! expects it on every later call. [`TransitSession`] owns that cookie and
//! guarantees at most one login in flight per session: concurrent callers
//! that find no valid session all await the same shared login future.
//!
//! Each successful login is stamped with an epoch. A caller that sees its
//! request rejected invalidates only the epoch it used, so a stale rejection
//! cannot discard a session another caller has already renewed.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use reqwest::header::{COOKIE, HeaderMap, RETRY_AFTER, SET_COOKIE};
use reqwest::{Client, Method, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::SptransConfig;
use crate::error::SptransError;
use crate::retry::{ExponentialBackoff, RetryContext, RetryDecision, RetryPolicy};

const LOGIN_PATH: &str = "/Login/Autenticar";
const BODY_EXCERPT_LEN: usize = 200;

/// Session cookie issued by a successful login
///
/// Sent verbatim as the `Cookie` header. The value is never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(Arc<str>);

impl SessionToken {
    /// Build a token from the `Set-Cookie` headers of a login response
    ///
    /// Keeps the `name=value` part of each cookie and drops its attributes.
    /// Returns `None` when no usable cookie was set.
    #[must_use]
    pub fn from_set_cookie(headers: &HeaderMap) -> Option<Self> {
        let pairs: Vec<&str> = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|cookie| cookie.split(';').next())
            .map(str::trim)
            .filter(|pair| pair.contains('=') && !pair.starts_with('='))
            .collect();

        if pairs.is_empty() {
            None
        } else {
            Some(Self(Arc::from(pairs.join("; "))))
        }
    }

    /// The `Cookie` header value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

type LoginFuture = Shared<BoxFuture<'static, Result<SessionToken, SptransError>>>;

enum Phase {
    Unauthenticated,
    Authenticating { epoch: u64, login: LoginFuture },
    Authenticated { epoch: u64, token: SessionToken },
}

struct SessionInner {
    phase: Phase,
    next_epoch: u64,
}

/// Everything a login needs, owned so the shared future can be `'static`
struct LoginRequest {
    http: Client,
    url: String,
    credential: SecretString,
    timeout: Duration,
    policy: Arc<dyn RetryPolicy>,
}

/// Session-authenticated HTTP access to the Olho Vivo API
pub struct TransitSession {
    http: Client,
    base_url: String,
    credential: Option<SecretString>,
    timeout_secs: u64,
    login_timeout: Duration,
    policy: Arc<dyn RetryPolicy>,
    inner: Mutex<SessionInner>,
}

impl fmt::Debug for TransitSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitSession")
            .field("base_url", &self.base_url)
            .field("has_credential", &self.credential.is_some())
            .field("timeout_secs", &self.timeout_secs)
            .field("policy", &self.policy)
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl TransitSession {
    /// Create a session with the configured backoff policy
    ///
    /// No network traffic happens until the first request.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be initialized.
    pub fn new(config: &SptransConfig) -> Result<Self, SptransError> {
        config.validate().map_err(SptransError::ConfigurationError)?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("MobilizaSP/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SptransError::ConnectionFailed(e.to_string()))?;

        let credential = config
            .token
            .clone()
            .filter(|_| config.has_credential());

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credential,
            timeout_secs: config.timeout_secs,
            login_timeout: Duration::from_secs(config.login_timeout_secs),
            policy: Arc::new(ExponentialBackoff::new(config.retry.clone())),
            inner: Mutex::new(SessionInner {
                phase: Phase::Unauthenticated,
                next_epoch: 1,
            }),
        })
    }

    /// Replace the retry policy
    #[must_use]
    pub fn with_retry_policy(mut self, policy: Arc<dyn RetryPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Whether a session cookie is currently held
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self.inner.lock().phase, Phase::Authenticated { .. })
    }

    /// Log in unless a session is already held
    ///
    /// # Errors
    ///
    /// Returns the login error, or [`SptransError::CredentialMissing`] when no
    /// credential is configured.
    pub async fn authenticate(&self) -> Result<(), SptransError> {
        self.ensure_session().await.map(|_| ())
    }

    /// Run a request with a valid session, logging in first when needed
    ///
    /// Transient failures are retried according to the policy. When the
    /// upstream rejects the session, the session is renewed and the request
    /// repeated exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`SptransError::CredentialMissing`] without any network call
    /// when no credential is configured, [`SptransError::AuthenticationRejected`]
    /// when the credential is refused (including a second rejection right
    /// after a fresh login), and the last request error otherwise.
    #[instrument(skip(self, params))]
    pub async fn authenticated_request(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Value, SptransError> {
        let mut renewed = false;

        loop {
            let (epoch, token) = self.ensure_session().await?;

            match self.request_with_retry(&method, path, params, &token).await {
                Err(SptransError::SessionExpired { status }) => {
                    self.invalidate(epoch);
                    if renewed {
                        return Err(SptransError::AuthenticationRejected(format!(
                            "session rejected again right after login (HTTP {status})"
                        )));
                    }
                    info!(status, epoch, "Session rejected, logging in again");
                    renewed = true;
                },
                other => return other,
            }
        }
    }

    /// Current session, joining or starting a login when there is none
    async fn ensure_session(&self) -> Result<(u64, SessionToken), SptransError> {
        let (epoch, login) = {
            let mut inner = self.inner.lock();
            match &inner.phase {
                Phase::Authenticated { epoch, token } => return Ok((*epoch, token.clone())),
                Phase::Authenticating { epoch, login } => (*epoch, login.clone()),
                Phase::Unauthenticated => {
                    let request = self.login_request()?;
                    let epoch = inner.next_epoch;
                    inner.next_epoch += 1;
                    let login = perform_login(request).boxed().shared();
                    inner.phase = Phase::Authenticating {
                        epoch,
                        login: login.clone(),
                    };
                    debug!(epoch, "Starting login");
                    (epoch, login)
                },
            }
        };

        let result = login.await;

        let mut inner = self.inner.lock();
        if matches!(inner.phase, Phase::Authenticating { epoch: current, .. } if current == epoch) {
            inner.phase = match &result {
                Ok(token) => Phase::Authenticated {
                    epoch,
                    token: token.clone(),
                },
                Err(_) => Phase::Unauthenticated,
            };
        }

        result.map(|token| (epoch, token))
    }

    /// Drop the session if it is still the one issued at `epoch`
    fn invalidate(&self, epoch: u64) {
        let mut inner = self.inner.lock();
        if matches!(inner.phase, Phase::Authenticated { epoch: current, .. } if current == epoch) {
            inner.phase = Phase::Unauthenticated;
        }
    }

    fn login_request(&self) -> Result<LoginRequest, SptransError> {
        let credential = self
            .credential
            .clone()
            .ok_or(SptransError::CredentialMissing)?;

        Ok(LoginRequest {
            http: self.http.clone(),
            url: format!("{}{LOGIN_PATH}", self.base_url),
            credential,
            timeout: self.login_timeout,
            policy: Arc::clone(&self.policy),
        })
    }

    async fn request_with_retry(
        &self,
        method: &Method,
        path: &str,
        params: &[(&str, String)],
        token: &SessionToken,
    ) -> Result<Value, SptransError> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            let error = match self.send_once(method, path, params, token).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            match self.policy.decide(&RetryContext {
                method,
                error: &error,
                attempt,
            }) {
                RetryDecision::Retry { delay } => {
                    warn!(
                        path,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %error,
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                },
                RetryDecision::GiveUp => return Err(error),
            }
        }
    }

    async fn send_once(
        &self,
        method: &Method,
        path: &str,
        params: &[(&str, String)],
        token: &SessionToken,
    ) -> Result<Value, SptransError> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "Sending request");

        let response = self
            .http
            .request(method.clone(), &url)
            .query(params)
            .header(COOKIE, token.as_str())
            .send()
            .await
            .map_err(|e| map_send_error(&e, self.timeout_secs))?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(SptransError::SessionExpired {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(error_for_status(response, path).await);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| map_send_error(&e, self.timeout_secs))?;

        serde_json::from_slice(&body).map_err(|e| SptransError::ParseError(e.to_string()))
    }
}

/// Login with retries; only rate limiting is retried since login is a POST
async fn perform_login(request: LoginRequest) -> Result<SessionToken, SptransError> {
    let mut attempt = 0;

    loop {
        attempt += 1;
        let error = match login_once(&request).await {
            Ok(token) => {
                info!(attempt, "Logged in to Olho Vivo");
                return Ok(token);
            },
            Err(error) => error,
        };

        match request.policy.decide(&RetryContext {
            method: &Method::POST,
            error: &error,
            attempt,
        }) {
            RetryDecision::Retry { delay } => {
                warn!(attempt, error = %error, "Login failed, retrying");
                tokio::time::sleep(delay).await;
            },
            RetryDecision::GiveUp => {
                warn!(attempt, error = %error, "Login failed");
                return Err(error);
            },
        }
    }
}

async fn login_once(request: &LoginRequest) -> Result<SessionToken, SptransError> {
    let timeout_secs = request.timeout.as_secs();

    let response = request
        .http
        .post(&request.url)
        .query(&[("token", request.credential.expose_secret())])
        .timeout(request.timeout)
        .send()
        .await
        .map_err(|e| map_send_error(&e, timeout_secs))?;

    let status = response.status();
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return Err(SptransError::AuthenticationRejected(format!(
            "login refused with HTTP {status}"
        )));
    }
    if !status.is_success() {
        return Err(error_for_status(response, LOGIN_PATH).await);
    }

    let cookie = SessionToken::from_set_cookie(response.headers());
    let body = response
        .text()
        .await
        .map_err(|e| map_send_error(&e, timeout_secs))?;

    if !body.trim().eq_ignore_ascii_case("true") {
        return Err(SptransError::AuthenticationRejected(
            "credential refused by login endpoint".to_string(),
        ));
    }

    cookie.ok_or_else(|| {
        SptransError::AuthenticationRejected("login succeeded without a session cookie".to_string())
    })
}

fn map_send_error(error: &reqwest::Error, timeout_secs: u64) -> SptransError {
    if error.is_timeout() {
        SptransError::Timeout { timeout_secs }
    } else {
        SptransError::ConnectionFailed(error.to_string())
    }
}

/// Classify a non-success status other than 401/403
async fn error_for_status(response: Response, path: &str) -> SptransError {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        return SptransError::RateLimitExceeded {
            retry_after_secs: response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok()),
        };
    }
    if status == StatusCode::NOT_FOUND {
        return SptransError::NotFound(path.to_string());
    }
    if status.is_server_error() {
        return SptransError::ServerError {
            status: status.as_u16(),
        };
    }

    let message: String = response
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(BODY_EXCERPT_LEN)
        .collect();

    SptransError::RequestRejected {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    fn headers(cookies: &[&str]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for cookie in cookies {
            map.append(SET_COOKIE, HeaderValue::from_str(cookie).unwrap());
        }
        map
    }

    #[test]
    fn token_keeps_name_value_pairs() {
        let token = SessionToken::from_set_cookie(&headers(&[
            "apiCredentials=ABC123; path=/; HttpOnly",
            "other=1; Secure",
        ]))
        .unwrap();
        assert_eq!(token.as_str(), "apiCredentials=ABC123; other=1");
    }

    #[test]
    fn token_requires_a_cookie() {
        assert!(SessionToken::from_set_cookie(&HeaderMap::new()).is_none());
        assert!(SessionToken::from_set_cookie(&headers(&["; path=/"])).is_none());
    }

    #[test]
    fn token_debug_is_redacted() {
        let token = SessionToken::from_set_cookie(&headers(&["apiCredentials=SECRET"])).unwrap();
        let debug = format!("{token:?}");
        assert!(!debug.contains("SECRET"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn new_session_is_unauthenticated() {
        let session = TransitSession::new(&SptransConfig::for_testing()).unwrap();
        assert!(!session.is_authenticated());
    }

    #[test]
    fn new_rejects_invalid_config() {
        let config = SptransConfig {
            timeout_secs: 0,
            ..SptransConfig::for_testing()
        };
        assert!(matches!(
            TransitSession::new(&config),
            Err(SptransError::ConfigurationError(_))
        ));
    }

    #[test]
    fn debug_hides_credential() {
        let session =
            TransitSession::new(&SptransConfig::default().with_token("do-not-print")).unwrap();
        let debug = format!("{session:?}");
        assert!(!debug.contains("do-not-print"));
        assert!(debug.contains("has_credential: true"));
    }

    #[tokio::test]
    async fn blank_credential_fails_before_any_request() {
        let config = SptransConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..SptransConfig::default().with_token("  ")
        };
        let session = TransitSession::new(&config).unwrap();
        let result = session
            .authenticated_request(Method::GET, "/Linha/Buscar", &[])
            .await;
        assert!(matches!(result, Err(SptransError::CredentialMissing)));
        assert!(!session.is_authenticated());
    }
}
