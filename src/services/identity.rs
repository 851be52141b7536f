// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase Authentication (Identity Toolkit) client.
//!
//! Handles:
//! - Account creation with email/password
//! - Password sign-in
//! - Provider session bookkeeping (ID tokens held per uid, refreshed before
//!   they expire)
//! - Mapping REST error messages onto SDK-style `auth/...` codes

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use ring::rand::{SecureRandom, SystemRandom};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;

use crate::error::AppError;

/// Minimum password length enforced by Firebase.
const MIN_PASSWORD_LEN: usize = 6;

/// Refresh ID tokens this long before they expire.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 300;

/// ID token lifetime when the provider does not report one.
const DEFAULT_ID_TOKEN_TTL_SECS: i64 = 3600;

/// Identity Toolkit REST client.
#[derive(Clone)]
pub struct IdentityClient {
    http: reqwest::Client,
    base_url: String,
    token_url: String,
    api_key: String,
}

/// Request body shared by `accounts:signUp` and `accounts:signInWithPassword`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

/// Successful sign-up / sign-in response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub local_id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub id_token: String,
    #[serde(default)]
    pub refresh_token: String,
    /// ID token lifetime in seconds (sent as a string)
    #[serde(default)]
    pub expires_in: String,
}

/// Secure Token API response (snake_case, unlike Identity Toolkit).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRefreshResponse {
    pub id_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl IdentityClient {
    /// Create a client for the given Firebase Web API key.
    ///
    /// Honours FIREBASE_AUTH_EMULATOR_HOST for local development.
    pub fn new(api_key: String) -> Self {
        match std::env::var("FIREBASE_AUTH_EMULATOR_HOST") {
            Ok(host) => Self::with_endpoints(
                api_key,
                format!("http://{}/identitytoolkit.googleapis.com/v1", host),
                format!("http://{}/securetoken.googleapis.com/v1/token", host),
            ),
            Err(_) => Self::with_endpoints(
                api_key,
                "https://identitytoolkit.googleapis.com/v1".to_string(),
                "https://securetoken.googleapis.com/v1/token".to_string(),
            ),
        }
    }

    fn with_endpoints(api_key: String, base_url: String, token_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            token_url,
            api_key,
        }
    }

    /// Create an account with email and password.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthResponse, AppError> {
        self.post_password("accounts:signUp", email, password).await
    }

    /// Exchange email and password for a session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthResponse, AppError> {
        self.post_password("accounts:signInWithPassword", email, password)
            .await
    }

    async fn post_password(
        &self,
        method: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, AppError> {
        let url = format!("{}/{}", self.base_url, method);

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&PasswordRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(network_error)?;

        self.check_response_json(response).await
    }

    /// Exchange a refresh token for a new ID token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenRefreshResponse, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .query(&[("key", self.api_key.as_str())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(network_error)?;

        self.check_response_json(response).await
    }

    async fn check_response_json<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|env| env.error.message)
                .unwrap_or_else(|_| format!("HTTP {}", status));
            tracing::debug!(status = %status, message = %message, "Identity Toolkit error");
            return Err(AppError::provider(sdk_error_code(&message)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JSON parse error: {}", e)))
    }
}

fn network_error(e: reqwest::Error) -> AppError {
    tracing::warn!(error = %e, "Identity provider request failed");
    AppError::provider("auth/network-request-failed")
}

/// Map an Identity Toolkit REST error message onto the web SDK error code.
///
/// REST messages look like `EMAIL_EXISTS` or
/// `WEAK_PASSWORD : Password should be at least 6 characters`.
pub fn sdk_error_code(rest_message: &str) -> String {
    let key = rest_message
        .split(" : ")
        .next()
        .unwrap_or(rest_message)
        .trim();

    let code = match key {
        "EMAIL_EXISTS" => "auth/email-already-in-use",
        "INVALID_EMAIL" | "MISSING_EMAIL" => "auth/invalid-email",
        "WEAK_PASSWORD" => "auth/weak-password",
        "MISSING_PASSWORD" => "auth/missing-password",
        "EMAIL_NOT_FOUND" => "auth/user-not-found",
        "INVALID_PASSWORD" => "auth/wrong-password",
        "INVALID_LOGIN_CREDENTIALS" => "auth/invalid-credential",
        "USER_DISABLED" => "auth/user-disabled",
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "auth/too-many-requests",
        "OPERATION_NOT_ALLOWED" => "auth/operation-not-allowed",
        "API_KEY_INVALID" | "INVALID_API_KEY" => "auth/invalid-api-key",
        "TOKEN_EXPIRED" => "auth/user-token-expired",
        "INVALID_REFRESH_TOKEN" => "auth/invalid-user-token",
        "USER_NOT_FOUND" => "auth/user-not-found",
        other => {
            return format!("auth/{}", other.to_lowercase().replace('_', "-"));
        }
    };
    code.to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// IdentityService - provider facade with an offline backend
// ─────────────────────────────────────────────────────────────────────────────

/// The user an identity provider vouched for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub uid: String,
    pub email: String,
}

/// Offline account record.
struct MockAccount {
    uid: String,
    password_digest: [u8; 32],
}

#[derive(Clone)]
enum Provider {
    Firebase(IdentityClient),
    Memory(Arc<DashMap<String, MockAccount>>),
}

/// Tokens the provider issued for a signed-in user.
#[derive(Clone, Default)]
struct ProviderSession {
    id_token: String,
    refresh_token: String,
    /// `None` for offline sessions, which carry no tokens
    expires_at: Option<DateTime<Utc>>,
}

impl ProviderSession {
    fn issued(
        id_token: String,
        refresh_token: String,
        expires_in: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let ttl = expires_in
            .trim()
            .parse::<i64>()
            .unwrap_or(DEFAULT_ID_TOKEN_TTL_SECS);
        Self {
            id_token,
            refresh_token,
            expires_at: Some(now + Duration::seconds(ttl)),
        }
    }

    fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) if !self.refresh_token.is_empty() => {
                now + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) >= expires_at
            }
            _ => false,
        }
    }

    fn id_token(&self) -> Option<String> {
        (!self.id_token.is_empty()).then(|| self.id_token.clone())
    }
}

impl From<&AuthResponse> for ProviderSession {
    fn from(res: &AuthResponse) -> Self {
        Self::issued(
            res.id_token.clone(),
            res.refresh_token.clone(),
            &res.expires_in,
            Utc::now(),
        )
    }
}

/// Identity provider facade.
///
/// Tracks one provider session per signed-in uid.
#[derive(Clone)]
pub struct IdentityService {
    provider: Provider,
    sessions: Arc<DashMap<String, ProviderSession>>,
    /// One token refresh per user at a time
    refresh_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl IdentityService {
    pub fn new(api_key: String) -> Self {
        Self {
            provider: Provider::Firebase(IdentityClient::new(api_key)),
            sessions: Arc::new(DashMap::new()),
            refresh_locks: Arc::new(DashMap::new()),
        }
    }

    /// In-memory identity provider for tests and offline mode.
    pub fn new_mock() -> Self {
        Self {
            provider: Provider::Memory(Arc::new(DashMap::new())),
            sessions: Arc::new(DashMap::new()),
            refresh_locks: Arc::new(DashMap::new()),
        }
    }

    /// Create an account. The new user is signed in.
    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthenticatedUser, AppError> {
        let user = match &self.provider {
            Provider::Firebase(client) => {
                let res = client.sign_up(email, password).await?;
                self.sessions
                    .insert(res.local_id.clone(), ProviderSession::from(&res));
                AuthenticatedUser {
                    uid: res.local_id,
                    email: res.email,
                }
            }
            Provider::Memory(accounts) => {
                let email = email.trim().to_lowercase();
                check_credentials_shape(&email, password)?;
                let uid = generate_uid()?;
                let digest = password_digest(&uid, password);

                match accounts.entry(email.clone()) {
                    dashmap::mapref::entry::Entry::Occupied(_) => {
                        return Err(AppError::provider("auth/email-already-in-use"));
                    }
                    dashmap::mapref::entry::Entry::Vacant(slot) => {
                        slot.insert(MockAccount {
                            uid: uid.clone(),
                            password_digest: digest,
                        });
                    }
                }
                self.sessions.insert(uid.clone(), ProviderSession::default());
                AuthenticatedUser { uid, email }
            }
        };

        tracing::info!(uid = %user.uid, "Account created");
        Ok(user)
    }

    /// Sign in with email and password.
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthenticatedUser, AppError> {
        let user = match &self.provider {
            Provider::Firebase(client) => {
                let res = client.sign_in(email, password).await?;
                self.sessions
                    .insert(res.local_id.clone(), ProviderSession::from(&res));
                AuthenticatedUser {
                    uid: res.local_id,
                    email: res.email,
                }
            }
            Provider::Memory(accounts) => {
                let email = email.trim().to_lowercase();
                let account = accounts
                    .get(&email)
                    .ok_or_else(|| AppError::provider("auth/invalid-credential"))?;
                let digest = password_digest(&account.uid, password);
                if !bool::from(digest[..].ct_eq(&account.password_digest[..])) {
                    return Err(AppError::provider("auth/invalid-credential"));
                }
                self.sessions
                    .insert(account.uid.clone(), ProviderSession::default());
                AuthenticatedUser {
                    uid: account.uid.clone(),
                    email,
                }
            }
        };

        tracing::info!(uid = %user.uid, "Signed in");
        Ok(user)
    }

    /// End the provider session for a user.
    ///
    /// Signing out a user without a session is not an error.
    pub async fn sign_out(&self, uid: &str) -> Result<(), AppError> {
        self.refresh_locks.remove(uid);
        if self.sessions.remove(uid).is_some() {
            tracing::info!(uid, "Signed out");
        } else {
            tracing::debug!(uid, "Sign-out without an active provider session");
        }
        Ok(())
    }

    /// ID token for calls made on the user's behalf (e.g. Storage uploads).
    ///
    /// A token within [`TOKEN_REFRESH_MARGIN_SECS`] of expiry is exchanged
    /// for a new one first. Offline sessions have no token.
    pub async fn fresh_id_token(&self, uid: &str) -> Result<Option<String>, AppError> {
        let Some(session) = self.session(uid) else {
            return Ok(None);
        };
        if !session.needs_refresh(Utc::now()) {
            return Ok(session.id_token());
        }

        let lock = self
            .refresh_locks
            .entry(uid.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Another request may have refreshed while we waited
        let Some(session) = self.session(uid) else {
            return Ok(None);
        };
        if !session.needs_refresh(Utc::now()) {
            return Ok(session.id_token());
        }

        let Provider::Firebase(client) = &self.provider else {
            return Ok(session.id_token());
        };
        let refreshed = client.refresh(&session.refresh_token).await.map_err(|e| {
            tracing::warn!(uid, error = %e, "ID token refresh failed");
            e
        })?;
        let renewed = ProviderSession::issued(
            refreshed.id_token,
            refreshed.refresh_token,
            &refreshed.expires_in,
            Utc::now(),
        );
        let token = renewed.id_token();

        // Signed out while refreshing: leave the session gone
        if let Some(mut slot) = self.sessions.get_mut(uid) {
            *slot = renewed;
        }
        tracing::info!(uid, "Refreshed provider ID token");
        Ok(token)
    }

    fn session(&self, uid: &str) -> Option<ProviderSession> {
        self.sessions.get(uid).map(|s| s.value().clone())
    }

    /// Whether the provider currently holds a session for `uid`.
    pub fn is_signed_in(&self, uid: &str) -> bool {
        self.sessions.contains_key(uid)
    }
}

/// Same checks the provider applies before creating an account.
fn check_credentials_shape(email: &str, password: &str) -> Result<(), AppError> {
    let valid_email = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
        .unwrap_or(false);
    if !valid_email {
        return Err(AppError::provider("auth/invalid-email"));
    }
    if password.is_empty() {
        return Err(AppError::provider("auth/missing-password"));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::provider("auth/weak-password"));
    }
    Ok(())
}

/// 28-character uid, the same shape Firebase issues.
fn generate_uid() -> Result<String, AppError> {
    let mut bytes = [0u8; 14];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Random uid generation failed")))?;
    Ok(hex::encode(bytes))
}

/// Salted SHA-256 of the password (offline accounts only).
fn password_digest(uid: &str, password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(uid.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sdk_error_code_known_messages() {
        assert_eq!(sdk_error_code("EMAIL_EXISTS"), "auth/email-already-in-use");
        assert_eq!(
            sdk_error_code("WEAK_PASSWORD : Password should be at least 6 characters"),
            "auth/weak-password"
        );
        assert_eq!(
            sdk_error_code("INVALID_LOGIN_CREDENTIALS"),
            "auth/invalid-credential"
        );
    }

    #[test]
    fn test_sdk_error_code_unknown_message() {
        assert_eq!(sdk_error_code("SOMETHING_ODD"), "auth/something-odd");
    }

    #[tokio::test]
    async fn test_mock_signup_then_signin() {
        let identity = IdentityService::new_mock();
        let created = identity
            .create_account("Alice@X.com", "secret123")
            .await
            .unwrap();
        assert_eq!(created.uid.len(), 28);
        assert_eq!(created.email, "alice@x.com");

        let signed_in = identity.sign_in("alice@x.com", "secret123").await.unwrap();
        assert_eq!(signed_in.uid, created.uid);
    }

    #[tokio::test]
    async fn test_mock_rejects_duplicate_and_bad_password() {
        let identity = IdentityService::new_mock();
        identity.create_account("a@x.com", "secret123").await.unwrap();

        let dup = identity
            .create_account("a@x.com", "secret123")
            .await
            .unwrap_err();
        assert_eq!(dup.user_message(), "email already in use");

        let wrong = identity.sign_in("a@x.com", "nope-nope").await.unwrap_err();
        assert_eq!(wrong.user_message(), "invalid credential");

        let weak = identity.create_account("b@x.com", "123").await.unwrap_err();
        assert_eq!(weak.user_message(), "weak password");
    }

    fn unreachable_firebase() -> IdentityService {
        IdentityService {
            provider: Provider::Firebase(IdentityClient::with_endpoints(
                "key".to_string(),
                "http://127.0.0.1:9/identitytoolkit".to_string(),
                "http://127.0.0.1:9/token".to_string(),
            )),
            sessions: Arc::new(DashMap::new()),
            refresh_locks: Arc::new(DashMap::new()),
        }
    }

    #[test]
    fn test_needs_refresh_near_expiry() {
        let now = Utc::now();
        let session =
            ProviderSession::issued("id".to_string(), "refresh".to_string(), "3600", now);
        assert!(!session.needs_refresh(now));
        assert!(!session.needs_refresh(now + Duration::seconds(3000)));
        assert!(session.needs_refresh(now + Duration::seconds(3400)));
        assert!(session.needs_refresh(now + Duration::seconds(7200)));

        // Missing lifetime falls back to an hour
        let session = ProviderSession::issued("id".to_string(), "r".to_string(), "", now);
        assert!(session.needs_refresh(now + Duration::seconds(3400)));

        // Offline sessions never refresh
        assert!(!ProviderSession::default().needs_refresh(now + Duration::days(365)));
    }

    #[tokio::test]
    async fn test_fresh_token_is_returned_without_refresh() {
        let identity = unreachable_firebase();
        identity.sessions.insert(
            "uid-1".to_string(),
            ProviderSession::issued("id-1".to_string(), "r-1".to_string(), "3600", Utc::now()),
        );
        assert_eq!(
            identity.fresh_id_token("uid-1").await.unwrap().as_deref(),
            Some("id-1")
        );
        assert_eq!(identity.fresh_id_token("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_before_use() {
        let identity = unreachable_firebase();
        identity.sessions.insert(
            "uid-1".to_string(),
            ProviderSession::issued(
                "stale".to_string(),
                "r-1".to_string(),
                "3600",
                Utc::now() - Duration::hours(2),
            ),
        );

        // The refresh endpoint is down, so the refresh attempt surfaces
        let err = identity.fresh_id_token("uid-1").await.unwrap_err();
        assert_eq!(err.user_message(), "network request failed");
        assert_eq!(identity.session("uid-1").unwrap().id_token, "stale");
    }

    #[tokio::test]
    async fn test_offline_sessions_have_no_token() {
        let identity = IdentityService::new_mock();
        let user = identity.create_account("d@x.com", "secret123").await.unwrap();
        assert_eq!(identity.fresh_id_token(&user.uid).await.unwrap(), None);
    }

    #[test]
    fn test_sdk_error_code_refresh_messages() {
        assert_eq!(sdk_error_code("TOKEN_EXPIRED"), "auth/user-token-expired");
        assert_eq!(
            sdk_error_code("INVALID_REFRESH_TOKEN"),
            "auth/invalid-user-token"
        );
    }

    #[tokio::test]
    async fn test_sign_out_ends_session() {
        let identity = IdentityService::new_mock();
        let user = identity.create_account("c@x.com", "secret123").await.unwrap();
        assert!(identity.is_signed_in(&user.uid));

        identity.sign_out(&user.uid).await.unwrap();
        assert!(!identity.is_signed_in(&user.uid));
        // Idempotent
        identity.sign_out(&user.uid).await.unwrap();
    }
}
