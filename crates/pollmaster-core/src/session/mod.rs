//! Client session store.
//!
//! One `SessionStore` is built at process start and shared by reference with
//! every collaborator. It owns the backend credential, persists it to durable
//! storage, and is the only writer of session keys. Token and user are always
//! committed together; a failed or cancelled request leaves both untouched.

use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{decode, path_segment, ApiClient, ApiReply};
use crate::auth::{parse_otp, validate_email, validate_password_policy, validate_sign_in, SignUpRequest};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::models::User;
use crate::storage::{clear_session_keys, keys, load_json, save_json, KeyValueStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticating,
    /// Registered and holding a token, waiting for the OTP step
    PendingVerification,
    Authenticated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn(User),
    /// A token was issued; call [`SessionStore::verify_otp`] next
    VerificationRequired { email: String },
    /// No token was issued; the user must confirm by email, then sign in
    ConfirmationRequired,
}

#[derive(Default)]
struct SessionInner {
    state: SessionState,
    user: Option<User>,
    token: Option<String>,
    submitting: bool,
    last_submission: Option<Instant>,
}

pub struct SessionStore<S: KeyValueStore> {
    api: ApiClient,
    storage: S,
    inner: Mutex<SessionInner>,
}

impl<S: KeyValueStore> fmt::Debug for SessionStore<S> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (state, user) = self.lock().map_or((None, None), |inner| {
            (Some(inner.state), inner.user.as_ref().map(|user| user.id.clone()))
        });
        formatter
            .debug_struct("SessionStore")
            .field("state", &state)
            .field("user", &user)
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct AuthPayload {
    #[serde(default, alias = "accessToken")]
    token: Option<String>,
    #[serde(default)]
    user: Option<User>,
}

/// Resets the in-flight flag when an auth submission ends, including when the
/// caller drops the future mid-request.
struct Submission<'a, S: KeyValueStore> {
    session: &'a SessionStore<S>,
    previous: SessionState,
    settled: bool,
}

impl<S: KeyValueStore> Submission<'_, S> {
    fn settle(mut self) {
        self.settled = true;
    }
}

impl<S: KeyValueStore> Drop for Submission<'_, S> {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.session.inner.lock() {
            inner.submitting = false;
            if !self.settled && inner.state == SessionState::Authenticating {
                inner.state = self.previous;
            }
        }
    }
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(config: ClientConfig, storage: S) -> Result<Self> {
        Ok(Self::with_api(ApiClient::new(config)?, storage))
    }

    pub fn with_api(api: ApiClient, storage: S) -> Self {
        Self {
            api,
            storage,
            inner: Mutex::new(SessionInner::default()),
        }
    }

    pub const fn config(&self) -> &ClientConfig {
        self.api.config()
    }

    pub(crate) const fn api(&self) -> &ApiClient {
        &self.api
    }

    pub(crate) const fn storage(&self) -> &S {
        &self.storage
    }

    pub fn state(&self) -> SessionState {
        self.lock().map_or(SessionState::Unauthenticated, |inner| inner.state)
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    /// The validated user, present only in the `Authenticated` state.
    pub fn user(&self) -> Option<User> {
        self.lock().ok().and_then(|inner| inner.user.clone())
    }

    /// Last user written to storage, for display while offline.
    pub fn cached_user(&self) -> Result<Option<User>> {
        load_json(&self.storage, keys::USER)
    }

    pub(crate) fn current_token(&self) -> Result<Option<String>> {
        if let Some(token) = self.lock()?.token.clone() {
            return Ok(Some(token));
        }
        self.storage.get(keys::TOKEN)
    }

    /// Resume a persisted session.
    ///
    /// Without a stored token this is a no-op. A rejected token wipes storage;
    /// a network failure keeps it for the next attempt and is returned.
    pub async fn init(&self) -> Result<SessionState> {
        let Some(token) = self.storage.get(keys::TOKEN)? else {
            tracing::debug!("No persisted session");
            return Ok(SessionState::Unauthenticated);
        };
        if token.trim().is_empty() {
            clear_session_keys(&self.storage)?;
            return Ok(SessionState::Unauthenticated);
        }

        self.fetch_profile().await?;
        Ok(self.state())
    }

    /// Drop in-memory state. Persisted keys are left for the next `init`.
    pub fn teardown(&self) {
        if let Ok(mut inner) = self.lock() {
            *inner = SessionInner::default();
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User> {
        validate_sign_in(email, password)?;
        let submission = self.begin_submission()?;

        let payload = json!({
            "email": email.trim(),
            "password": password,
        });
        let reply = self
            .api
            .post(&self.config().routes.sign_in, &payload, None)
            .await?;
        if !reply.is_success() {
            return Err(map_sign_in_failure(reply));
        }

        let token = decode::<AuthPayload>(reply.into_data())?
            .token
            .and_then(|token| crate::util::normalize_text_option(Some(token)))
            .ok_or_else(|| Error::Api("Sign-in response did not include a token".to_string()))?;
        let user = self.resolve_profile(&token).await?;
        if !user.verified {
            self.hold_pending(token, true)?;
            submission.settle();
            tracing::info!("Signed in to unverified account {}; OTP required", user.id);
            return Err(Error::VerificationRequired);
        }

        self.commit(token, user.clone(), true)?;
        submission.settle();
        tracing::info!("Signed in as {} ({})", user.id, user.role);
        Ok(user)
    }

    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpOutcome> {
        let request = request.validated()?;
        if request.role.is_admin() {
            if let Some(expected) = self.config().admin_key.as_deref() {
                if request.admin_key.as_deref() != Some(expected) {
                    return Err(Error::Unauthorized("Invalid admin key".to_string()));
                }
            }
        }
        let submission = self.begin_submission()?;

        let payload = serde_json::to_value(&request)?;
        let reply = self
            .api
            .post(&self.config().routes.sign_up, &payload, None)
            .await?;
        if !reply.is_success() {
            return Err(reply.into_error());
        }

        let payload = decode::<AuthPayload>(reply.into_data())?;
        let Some(token) = crate::util::normalize_text_option(payload.token) else {
            tracing::info!("Sign-up accepted; email confirmation required");
            return Ok(SignUpOutcome::ConfirmationRequired);
        };

        if payload.user.as_ref().is_some_and(|user| user.verified) {
            let user = self.resolve_profile(&token).await?;
            if user.verified {
                self.commit(token, user.clone(), true)?;
                submission.settle();
                tracing::info!("Signed up and signed in as {}", user.id);
                return Ok(SignUpOutcome::SignedIn(user));
            }
        }

        self.hold_pending(token, true)?;
        submission.settle();
        tracing::info!("Sign-up pending OTP verification");
        Ok(SignUpOutcome::VerificationRequired {
            email: request.email,
        })
    }

    /// Confirm the six-digit code sent after registration.
    pub async fn verify_otp(&self, code: &str) -> Result<User> {
        let otp = parse_otp(code)?;
        let token = self.current_token()?.ok_or_else(|| {
            Error::Unauthorized(
                "Authentication token not found. Please sign up again.".to_string(),
            )
        })?;

        let reply = self
            .api
            .post(
                &self.config().routes.validate_otp,
                &json!({ "otp": otp }),
                Some(&token),
            )
            .await?;
        if reply.is_auth_rejection() {
            return Err(self.recheck_after_rejection(reply).await);
        }
        if !reply.is_success() {
            return Err(match reply.into_error() {
                Error::Api(message) | Error::NotFound(message) => Error::Validation(message),
                other => other,
            });
        }

        let user = self.resolve_profile(&token).await?;
        self.commit(token, user.clone(), false)?;
        tracing::info!("Account {} verified", user.id);
        Ok(user)
    }

    /// Resolve the current user from the held (or persisted) token.
    ///
    /// This is the only place a rejected token clears the session: user,
    /// token, and every session key in storage are wiped. An unverified
    /// account is held in `PendingVerification` whatever the prior state,
    /// so a restart never skips the OTP step.
    pub async fn fetch_profile(&self) -> Result<User> {
        let token = self
            .current_token()?
            .ok_or_else(|| Error::Unauthorized("Not signed in".to_string()))?;

        let user = match self.resolve_profile(&token).await {
            Ok(user) => user,
            Err(Error::Unauthorized(message)) => {
                self.expire(&token)?;
                return Err(Error::Unauthorized(message));
            }
            Err(error) => return Err(error),
        };

        if !user.verified {
            self.hold_pending(token, false)?;
            return Ok(user);
        }
        self.commit(token, user.clone(), false)?;
        Ok(user)
    }

    /// Sign out locally and wipe every persisted session key.
    pub fn sign_out(&self) -> Result<()> {
        clear_session_keys(&self.storage)?;
        let mut inner = self.lock()?;
        inner.state = SessionState::Unauthenticated;
        inner.user = None;
        inner.token = None;
        tracing::info!("Signed out");
        Ok(())
    }

    /// Ask the backend to email a password reset link.
    pub async fn forgot_password(&self, email: &str) -> Result<String> {
        validate_email(email)?;
        let reply = self
            .api
            .post(
                &self.config().routes.forgot_password,
                &json!({ "email": email.trim() }),
                None,
            )
            .await?;
        let data = reply.clone().into_success()?;
        Ok(reply_message(&reply.body)
            .or_else(|| reply_message(&data))
            .unwrap_or_else(|| "Password reset email sent".to_string()))
    }

    pub async fn reset_password(&self, reset_token: &str, new_password: &str) -> Result<()> {
        if reset_token.trim().is_empty() {
            return Err(Error::Validation("Reset token is required".to_string()));
        }
        validate_password_policy(new_password)?;

        let path = format!(
            "{}/{}",
            self.config().routes.reset_password,
            path_segment(reset_token)
        );
        self.api
            .post(&path, &json!({ "password": new_password }), None)
            .await?
            .into_success()?;
        tracing::info!("Password reset completed");
        Ok(())
    }

    /// Route an auth rejection from any endpoint through `fetch_profile`.
    pub(crate) async fn recheck_after_rejection(&self, reply: ApiReply) -> Error {
        let fallback = reply.into_error();
        match self.fetch_profile().await {
            Err(error @ Error::Unauthorized(_)) => error,
            _ => fallback,
        }
    }

    async fn resolve_profile(&self, token: &str) -> Result<User> {
        let reply = self
            .api
            .get(&self.config().routes.profile, Some(token))
            .await?;
        if !reply.is_success() {
            return Err(reply.into_error());
        }
        parse_profile(reply.into_data())
    }

    fn begin_submission(&self) -> Result<Submission<'_, S>> {
        let window = self.config().debounce_window();
        let mut inner = self.lock()?;
        let recent = inner
            .last_submission
            .is_some_and(|started| started.elapsed() < window);
        if inner.submitting || recent {
            tracing::debug!("Rejected duplicate auth submission");
            return Err(Error::DuplicateSubmission);
        }

        let previous = inner.state;
        inner.submitting = true;
        inner.last_submission = Some(Instant::now());
        inner.state = SessionState::Authenticating;
        drop(inner);

        Ok(Submission {
            session: self,
            previous,
            settled: false,
        })
    }

    /// Persist then publish a validated token/user pair.
    ///
    /// A `fresh` session starts from empty storage so cached collections of a
    /// previous account are not carried over.
    fn commit(&self, token: String, user: User, fresh: bool) -> Result<()> {
        if fresh {
            clear_session_keys(&self.storage)?;
        }
        self.storage.set(keys::TOKEN, &token)?;
        if let Err(error) = save_json(&self.storage, keys::USER, &user) {
            let _ = self.storage.remove(keys::TOKEN);
            return Err(error);
        }

        let mut inner = self.lock()?;
        inner.token = Some(token);
        inner.user = Some(user);
        inner.state = SessionState::Authenticated;
        Ok(())
    }

    /// Keep the token for the OTP step without exposing a user.
    fn hold_pending(&self, token: String, fresh: bool) -> Result<()> {
        if fresh {
            clear_session_keys(&self.storage)?;
        } else {
            self.storage.remove(keys::USER)?;
        }
        self.storage.set(keys::TOKEN, &token)?;
        let mut inner = self.lock()?;
        inner.token = Some(token);
        inner.user = None;
        inner.state = SessionState::PendingVerification;
        Ok(())
    }

    fn expire(&self, rejected_token: &str) -> Result<()> {
        let mut inner = self.lock()?;
        let current = match inner.token.clone() {
            Some(token) => Some(token),
            None => self.storage.get(keys::TOKEN)?,
        };
        if current.as_deref() != Some(rejected_token) {
            return Ok(());
        }
        clear_session_keys(&self.storage)?;
        inner.token = None;
        inner.user = None;
        inner.state = SessionState::Unauthenticated;
        tracing::warn!("Session token rejected; cleared persisted session");
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, SessionInner>> {
        self.inner
            .lock()
            .map_err(|error| Error::Storage(format!("session lock poisoned: {error}")))
    }
}

fn map_sign_in_failure(reply: ApiReply) -> Error {
    let status = reply.status.as_u16();
    if status == 403 {
        return Error::Unauthorized(reply.message());
    }
    if reply.status.is_success() || matches!(status, 400 | 401 | 404) {
        return Error::InvalidCredentials(reply.message());
    }
    reply.into_error()
}

fn parse_profile(data: Value) -> Result<User> {
    let value = match data {
        Value::Object(mut map) if map.get("user").is_some_and(Value::is_object) => {
            map.remove("user").unwrap_or(Value::Null)
        }
        other => other,
    };
    decode(value).map_err(|error| Error::Api(format!("Unexpected profile response: {error}")))
}

fn reply_message(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(ToString::to_string)
}
