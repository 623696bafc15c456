// Session lifecycle: login, token refresh, refresh scheduling.
//
// The access token is shared mutable state read by every in-flight
// request, so it is replaced wholesale through an ArcSwap -- readers load
// a consistent snapshot, writers store a whole new token. A failed login
// or refresh never disturbs a previously valid token.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::client::BasClient;
use crate::error::Error;

/// Lead time before expiry at which the scheduled refresh fires.
const REFRESH_LEAD: Duration = Duration::from_secs(60);

/// Longest single sleep the refresh task takes. Longer waits are chunked
/// so tokens with far-future expiries still refresh instead of silently
/// never being rescheduled.
const MAX_SLEEP_CHUNK: Duration = Duration::from_secs(60 * 60 * 24 * 30);

/// A session access token and its expiry instant.
///
/// Immutable value; each login/refresh replaces the client's current
/// token as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires: DateTime<Utc>,
}

impl AccessToken {
    /// Parse the `{accessToken, expires}` auth body.
    fn parse(value: &Value) -> Result<Self, Error> {
        let malformed = || Error::Token { body: value.to_string() };

        let token = value
            .get("accessToken")
            .and_then(Value::as_str)
            .ok_or_else(malformed)?
            .to_owned();
        let expires = value
            .get("expires")
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .ok_or_else(malformed)?
            .with_timezone(&Utc);

        Ok(Self { token, expires })
    }
}

// Sleep until `refresh_at` in bounded chunks, so an expiry years out
// still lands inside the timer's representable range.
async fn sleep_until_refresh(refresh_at: DateTime<Utc>) {
    let mut remaining = (refresh_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
    while !remaining.is_zero() {
        let step = remaining.min(MAX_SLEEP_CHUNK);
        tokio::time::sleep(step).await;
        remaining -= step;
    }
}

impl BasClient {
    /// Authenticate with the server and store the resulting access token.
    ///
    /// With `auto_refresh`, a background task re-requests the token one
    /// minute before it expires, so long-running integrations never see a
    /// caller-visible re-authentication step. A malformed auth body fails
    /// with [`Error::Token`] and leaves any previous session state intact.
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
        auto_refresh: bool,
    ) -> Result<AccessToken, Error> {
        self.inner.auto_refresh.store(auto_refresh, Ordering::Relaxed);

        let url = self.url("login")?;
        debug!("POST {url}");

        let body = json!({
            "username": username,
            "password": password.expose_secret(),
        });

        let resp = self
            .inner
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(Error::Transport)?;

        let value = Self::handle_json(resp).await?;
        self.apply_token(&value)
    }

    /// Request a fresh access token using the current session context.
    ///
    /// Same parse and failure contract as [`Self::login`].
    pub async fn refresh(&self) -> Result<AccessToken, Error> {
        let url = self.url("refreshToken")?;
        let resp = self.get_raw(url).await?;
        let value = Self::handle_json(resp).await?;
        self.apply_token(&value)
    }

    // Parse, swap the stored token atomically, and (re-)arm the refresh
    // schedule when auto-refresh is on. Parse failure leaves the stored
    // token untouched.
    fn apply_token(&self, value: &Value) -> Result<AccessToken, Error> {
        let token = AccessToken::parse(value)?;
        self.inner.token.store(Some(Arc::new(token.clone())));

        if self.inner.auto_refresh.load(Ordering::Relaxed) {
            self.schedule_refresh(token.expires);
        } else {
            self.disarm_refresh();
        }

        Ok(token)
    }

    // Tear down an armed schedule, e.g. after a re-login that turned
    // auto-refresh off.
    fn disarm_refresh(&self) {
        let mut guard = self
            .inner
            .refresh_task
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(task) = guard.take() {
            task.abort();
        }
    }

    // Arm a one-shot task that refreshes REFRESH_LEAD before `expires`
    // (immediately if that instant already passed). The task holds only a
    // weak reference: dropping the client tears the timer down instead of
    // keeping the session alive.
    fn schedule_refresh(&self, expires: DateTime<Utc>) {
        let weak = Arc::downgrade(&self.inner);

        let task = tokio::spawn(async move {
            let refresh_at = expires
                - chrono::Duration::from_std(REFRESH_LEAD).unwrap_or_else(|_| chrono::Duration::zero());
            sleep_until_refresh(refresh_at).await;

            let Some(inner) = weak.upgrade() else {
                return;
            };
            let client = BasClient { inner };
            match client.refresh().await {
                Ok(token) => debug!("access token refreshed, expires {}", token.expires),
                // No retry here: the next caller-visible failure surfaces
                // through the normal request path.
                Err(e) => warn!("scheduled token refresh failed: {e}"),
            }
        });

        let mut guard = self
            .inner
            .refresh_task
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(previous) = guard.replace(task) {
            previous.abort();
        }
    }
}
