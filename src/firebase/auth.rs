//! Google OAuth device flow exchanged for a Firebase session, plus token refresh.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::watch;

use crate::{
    domain::{
        session::Session,
        status::{SignInFailure, SignInPrompt},
    },
    infra::config::{FirebaseConfig, GoogleConfig},
};

const DEVICE_SCOPE: &str = "openid email profile";
const DEVICE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3_600);
/// Upper bounds for server-supplied lifetimes and intervals.
const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 3_600);
const MAX_DEVICE_CODE_LIFETIME: Duration = Duration::from_secs(3_600);
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(60);
/// Tokens this close to expiry are refreshed before use.
const REFRESH_SKEW: Duration = Duration::from_secs(60);
const FALLBACK_DISPLAY_NAME: &str = "Anonymous";

/// Firebase credentials for the signed-in user.
#[derive(Clone, PartialEq, Eq)]
pub(super) struct Tokens {
    pub id_token: Option<String>,
    pub refresh_token: String,
    pub expires_at: Option<Instant>,
}

impl Tokens {
    pub fn from_refresh_token(refresh_token: String) -> Self {
        Self {
            id_token: None,
            refresh_token,
            expires_at: None,
        }
    }

    pub fn usable_id_token(&self, now: Instant) -> Option<&str> {
        let expires_at = self.expires_at?;
        if expires_at.saturating_duration_since(now) <= REFRESH_SKEW {
            return None;
        }
        self.id_token.as_deref()
    }
}

impl std::fmt::Debug for Tokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokens")
            .field("has_id_token", &self.id_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct DeviceAuthorization {
    pub device_code: String,
    pub prompt: SignInPrompt,
    pub expires_in: Duration,
    pub interval: Duration,
}

#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    #[serde(alias = "verification_uri")]
    verification_url: String,
    expires_in: u64,
    interval: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TokenPollResponse {
    pub id_token: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum PollStatus {
    Pending,
    SlowDown,
    Granted(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdpSignInResponse {
    local_id: String,
    display_name: Option<String>,
    email: Option<String>,
    photo_url: Option<String>,
    id_token: String,
    refresh_token: String,
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct SignedIn {
    pub session: Session,
    pub tokens: Tokens,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum RefreshError {
    /// The refresh token is no longer valid; the session is over.
    Rejected,
    Unavailable,
}

pub(super) async fn request_device_code(
    http: &reqwest::Client,
    google: &GoogleConfig,
) -> Result<DeviceAuthorization, SignInFailure> {
    let response = http
        .post(format!("{}/device/code", google.oauth_base_url))
        .form(&[
            ("client_id", google.client_id.as_str()),
            ("scope", DEVICE_SCOPE),
        ])
        .send()
        .await
        .map_err(map_transport_error)?;

    let status = response.status();
    if !status.is_success() {
        tracing::warn!(status = status.as_u16(), "device code request rejected");
        return Err(if status.is_client_error() {
            SignInFailure::Misconfigured
        } else {
            SignInFailure::Transient
        });
    }

    let body: DeviceCodeResponse = response.json().await.map_err(|error| {
        tracing::warn!(error = %error, "device code response could not be decoded");
        SignInFailure::Transient
    })?;

    Ok(device_authorization(body))
}

fn device_authorization(body: DeviceCodeResponse) -> DeviceAuthorization {
    DeviceAuthorization {
        device_code: body.device_code,
        prompt: SignInPrompt {
            verification_url: body.verification_url,
            user_code: body.user_code,
        },
        expires_in: Duration::from_secs(body.expires_in).min(MAX_DEVICE_CODE_LIFETIME),
        interval: body
            .interval
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL)
            .min(MAX_POLL_INTERVAL),
    }
}

/// Polls until the user approves, declines, or the code expires. `Ok(None)` means cancelled.
pub(super) async fn wait_for_google_id_token(
    http: &reqwest::Client,
    google: &GoogleConfig,
    device: &DeviceAuthorization,
    stop: &mut watch::Receiver<bool>,
) -> Result<Option<String>, SignInFailure> {
    let deadline = instant_after(Instant::now(), device.expires_in);
    let mut interval = device.interval;

    loop {
        tokio::select! {
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    return Ok(None);
                }
                continue;
            }
            _ = tokio::time::sleep(interval) => {}
        }

        if Instant::now() >= deadline {
            return Err(SignInFailure::Expired);
        }

        let response = http
            .post(format!("{}/token", google.oauth_base_url))
            .form(&[
                ("client_id", google.client_id.as_str()),
                ("client_secret", google.client_secret.as_str()),
                ("device_code", device.device_code.as_str()),
                ("grant_type", DEVICE_GRANT_TYPE),
            ])
            .send()
            .await
            .map_err(map_transport_error)?;

        let body: TokenPollResponse = response.json().await.map_err(|error| {
            tracing::warn!(error = %error, "token poll response could not be decoded");
            SignInFailure::Transient
        })?;

        match classify_poll(body)? {
            PollStatus::Pending => {}
            PollStatus::SlowDown => {
                interval = interval.saturating_add(SLOW_DOWN_STEP).min(MAX_POLL_INTERVAL);
            }
            PollStatus::Granted(id_token) => return Ok(Some(id_token)),
        }
    }
}

pub(super) fn classify_poll(body: TokenPollResponse) -> Result<PollStatus, SignInFailure> {
    if let Some(id_token) = body.id_token {
        return Ok(PollStatus::Granted(id_token));
    }

    match body.error.as_deref() {
        Some("authorization_pending") => Ok(PollStatus::Pending),
        Some("slow_down") => Ok(PollStatus::SlowDown),
        Some("access_denied") => Err(SignInFailure::Denied),
        Some("expired_token") | Some("invalid_grant") => Err(SignInFailure::Expired),
        Some("invalid_client") | Some("unauthorized_client") => {
            Err(SignInFailure::Misconfigured)
        }
        other => {
            tracing::warn!(error = ?other, "unexpected token poll answer");
            Err(SignInFailure::Transient)
        }
    }
}

/// Exchanges a Google ID token for a Firebase session.
pub(super) async fn sign_in_with_google(
    http: &reqwest::Client,
    firebase: &FirebaseConfig,
    google_id_token: &str,
) -> Result<SignedIn, SignInFailure> {
    let response = http
        .post(format!(
            "{}/v1/accounts:signInWithIdp",
            firebase.auth_base_url
        ))
        .query(&[("key", firebase.api_key.as_str())])
        .json(&idp_request_body(google_id_token))
        .send()
        .await
        .map_err(map_transport_error)?;

    let status = response.status();
    if !status.is_success() {
        tracing::warn!(status = status.as_u16(), "firebase rejected google credential");
        return Err(if status.is_client_error() {
            SignInFailure::Misconfigured
        } else {
            SignInFailure::Transient
        });
    }

    let body: IdpSignInResponse = response.json().await.map_err(|error| {
        tracing::warn!(error = %error, "firebase sign-in response could not be decoded");
        SignInFailure::Transient
    })?;

    let display_name = body
        .display_name
        .filter(|name| !name.trim().is_empty())
        .or(body.email)
        .unwrap_or_else(|| FALLBACK_DISPLAY_NAME.to_owned());

    Ok(SignedIn {
        session: Session::new(body.local_id, display_name, body.photo_url),
        tokens: Tokens {
            id_token: Some(body.id_token),
            refresh_token: body.refresh_token,
            expires_at: Some(instant_after(
                Instant::now(),
                parse_expires_in(body.expires_in.as_deref()),
            )),
        },
    })
}

pub(super) async fn refresh_tokens(
    http: &reqwest::Client,
    firebase: &FirebaseConfig,
    refresh_token: &str,
) -> Result<Tokens, RefreshError> {
    let response = http
        .post(format!("{}/v1/token", firebase.secure_token_base_url))
        .query(&[("key", firebase.api_key.as_str())])
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .send()
        .await
        .map_err(|error| {
            tracing::debug!(timeout = error.is_timeout(), "token refresh transport failure");
            RefreshError::Unavailable
        })?;

    let status = response.status();
    if status == reqwest::StatusCode::BAD_REQUEST
        || status == reqwest::StatusCode::UNAUTHORIZED
        || status == reqwest::StatusCode::FORBIDDEN
    {
        return Err(RefreshError::Rejected);
    }
    if !status.is_success() {
        return Err(RefreshError::Unavailable);
    }

    let body: RefreshResponse = response
        .json()
        .await
        .map_err(|_| RefreshError::Unavailable)?;

    Ok(Tokens {
        id_token: Some(body.id_token),
        refresh_token: body.refresh_token,
        expires_at: Some(instant_after(
            Instant::now(),
            parse_expires_in(body.expires_in.as_deref()),
        )),
    })
}

pub(super) fn idp_request_body(google_id_token: &str) -> serde_json::Value {
    serde_json::json!({
        "postBody": format!("id_token={google_id_token}&providerId=google.com"),
        "requestUri": "http://localhost",
        "returnIdpCredential": true,
        "returnSecureToken": true,
    })
}

/// Firebase reports lifetimes as decimal strings of seconds.
pub(super) fn parse_expires_in(raw: Option<&str>) -> Duration {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TOKEN_LIFETIME)
        .min(MAX_TOKEN_LIFETIME)
}

/// `now + lifetime`, or `now` when the sum is not representable.
fn instant_after(now: Instant, lifetime: Duration) -> Instant {
    now.checked_add(lifetime).unwrap_or(now)
}

fn map_transport_error(error: reqwest::Error) -> SignInFailure {
    if error.is_timeout() {
        SignInFailure::Timeout
    } else {
        tracing::warn!(connect = error.is_connect(), "identity provider unreachable");
        SignInFailure::Transient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll(id_token: Option<&str>, error: Option<&str>) -> TokenPollResponse {
        TokenPollResponse {
            id_token: id_token.map(str::to_owned),
            error: error.map(str::to_owned),
        }
    }

    #[test]
    fn classify_poll_grants_when_id_token_is_present() {
        assert_eq!(
            classify_poll(poll(Some("google-id"), None)),
            Ok(PollStatus::Granted("google-id".to_owned()))
        );
    }

    #[test]
    fn classify_poll_keeps_waiting_on_pending_and_slow_down() {
        assert_eq!(
            classify_poll(poll(None, Some("authorization_pending"))),
            Ok(PollStatus::Pending)
        );
        assert_eq!(
            classify_poll(poll(None, Some("slow_down"))),
            Ok(PollStatus::SlowDown)
        );
    }

    #[test]
    fn classify_poll_maps_terminal_errors() {
        assert_eq!(
            classify_poll(poll(None, Some("access_denied"))),
            Err(SignInFailure::Denied)
        );
        assert_eq!(
            classify_poll(poll(None, Some("expired_token"))),
            Err(SignInFailure::Expired)
        );
        assert_eq!(
            classify_poll(poll(None, Some("invalid_client"))),
            Err(SignInFailure::Misconfigured)
        );
        assert_eq!(
            classify_poll(poll(None, Some("server_meltdown"))),
            Err(SignInFailure::Transient)
        );
        assert_eq!(classify_poll(poll(None, None)), Err(SignInFailure::Transient));
    }

    #[test]
    fn device_code_response_accepts_both_url_spellings() {
        let google: DeviceCodeResponse = serde_json::from_str(
            r#"{"device_code":"d","user_code":"ABCD-EFGH","verification_url":"https://www.google.com/device","expires_in":1800,"interval":5}"#,
        )
        .expect("google spelling");
        let rfc: DeviceCodeResponse = serde_json::from_str(
            r#"{"device_code":"d","user_code":"ABCD-EFGH","verification_uri":"https://example.test/device","expires_in":600}"#,
        )
        .expect("rfc spelling");

        assert_eq!(google.verification_url, "https://www.google.com/device");
        assert_eq!(rfc.verification_url, "https://example.test/device");
        assert_eq!(rfc.interval, None);
    }

    #[test]
    fn idp_request_body_wraps_google_token_for_firebase() {
        let body = idp_request_body("google-id");

        assert_eq!(body["postBody"], "id_token=google-id&providerId=google.com");
        assert_eq!(body["returnSecureToken"], true);
    }

    #[test]
    fn parse_expires_in_defaults_to_one_hour() {
        assert_eq!(parse_expires_in(Some("120")), Duration::from_secs(120));
        assert_eq!(parse_expires_in(Some("soon")), DEFAULT_TOKEN_LIFETIME);
        assert_eq!(parse_expires_in(None), DEFAULT_TOKEN_LIFETIME);
    }

    #[test]
    fn oversized_lifetimes_are_clamped_and_never_overflow() {
        let lifetime = parse_expires_in(Some("18446744073709551615"));
        assert_eq!(lifetime, MAX_TOKEN_LIFETIME);

        let now = Instant::now();
        assert!(instant_after(now, lifetime) > now);
        assert_eq!(instant_after(now, Duration::MAX), now);
    }

    #[test]
    fn device_code_lifetime_and_interval_are_clamped() {
        let body: DeviceCodeResponse = serde_json::from_str(
            r#"{"device_code":"d","user_code":"ABCD-EFGH","verification_url":"https://www.google.com/device","expires_in":18446744073709551615,"interval":18446744073709551615}"#,
        )
        .expect("device code response");

        let device = device_authorization(body);

        assert_eq!(device.expires_in, MAX_DEVICE_CODE_LIFETIME);
        assert_eq!(device.interval, MAX_POLL_INTERVAL);
    }

    #[test]
    fn id_token_close_to_expiry_is_not_usable() {
        let now = Instant::now();
        let mut tokens = Tokens {
            id_token: Some("id".to_owned()),
            refresh_token: "refresh".to_owned(),
            expires_at: Some(now + Duration::from_secs(30)),
        };
        assert_eq!(tokens.usable_id_token(now), None);

        tokens.expires_at = Some(now + Duration::from_secs(600));
        assert_eq!(tokens.usable_id_token(now), Some("id"));
    }

    #[test]
    fn restored_tokens_need_refresh_before_use() {
        let tokens = Tokens::from_refresh_token("refresh".to_owned());

        assert_eq!(tokens.usable_id_token(Instant::now()), None);
    }

    #[test]
    fn debug_output_omits_token_values() {
        let tokens = Tokens {
            id_token: Some("secret-id".to_owned()),
            refresh_token: "secret-refresh".to_owned(),
            expires_at: None,
        };

        let rendered = format!("{tokens:?}");

        assert!(!rendered.contains("secret-id"));
        assert!(!rendered.contains("secret-refresh"));
    }
}
