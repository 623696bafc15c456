// BAS server HTTP client.
//
// Wraps `reqwest::Client` with versioned URL construction, bearer-token
// injection, and response handling. Endpoint groups (session, property
// I/O, object tree) are implemented as inherent methods via separate
// files to keep this module focused on transport mechanics.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwapOption;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::locale::{DEFAULT_LOCALE, EnumTranslator};
use crate::session::AccessToken;
use crate::transport::TransportConfig;

/// Server API version, used as a URL path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiVersion {
    #[default]
    V2,
    V3,
}

impl std::fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::V2 => f.write_str("v2"),
            Self::V3 => f.write_str("v3"),
        }
    }
}

/// Async client for a building-automation server's REST API.
///
/// Cheap to clone; clones share the HTTP connection pool, the current
/// access token, and the enumeration translator. Every request carries the
/// current token, which a background refresh task may replace at any time
/// -- requests never observe a partially updated credential.
#[derive(Clone)]
pub struct BasClient {
    pub(crate) inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub(crate) http: reqwest::Client,
    /// Always ends with `/api/{version}/` so relative joins work.
    pub(crate) base_url: Url,
    pub(crate) locale: String,
    pub(crate) translator: EnumTranslator,
    pub(crate) token: ArcSwapOption<AccessToken>,
    pub(crate) auto_refresh: AtomicBool,
    /// The armed pre-expiry refresh task, if any. Aborted on re-arm and
    /// when the client is dropped.
    pub(crate) refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.refresh_task.lock() {
            if let Some(task) = guard.take() {
                task.abort();
            }
        }
    }
}

impl BasClient {
    /// Create a client for `base_url` (scheme + host + optional port).
    ///
    /// The versioned API prefix is appended automatically:
    /// `https://bas.example.com` becomes `https://bas.example.com/api/v2/`.
    /// Uses an empty translator; see [`Self::with_translator`] when
    /// enumeration resources are available.
    pub fn new(
        base_url: &str,
        version: ApiVersion,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        Self::with_translator(base_url, version, transport, EnumTranslator::empty(), DEFAULT_LOCALE)
    }

    /// Create a client with enumeration translation resources and the
    /// locale used to render display strings.
    pub fn with_translator(
        base_url: &str,
        version: ApiVersion,
        transport: &TransportConfig,
        translator: EnumTranslator,
        locale: impl Into<String>,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        let base_url = Self::normalize_base_url(base_url, version)?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                locale: locale.into(),
                translator,
                token: ArcSwapOption::empty(),
                auto_refresh: AtomicBool::new(false),
                refresh_task: Mutex::new(None),
            }),
        })
    }

    /// Append `/api/{version}/` to the server origin.
    fn normalize_base_url(raw: &str, version: ApiVersion) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/api/{version}/"));
        Ok(url)
    }

    /// The enumeration translator shared by this client.
    pub fn translator(&self) -> &EnumTranslator {
        &self.inner.translator
    }

    /// The locale used for display strings.
    pub fn locale(&self) -> &str {
        &self.inner.locale
    }

    /// Snapshot of the current access token, if a session is active.
    pub fn access_token(&self) -> Option<AccessToken> {
        self.inner.token.load().as_deref().cloned()
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join a relative path (e.g. `"objects/{id}"`) onto the base URL.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        self.inner.base_url.join(path).map_err(Error::InvalidUrl)
    }

    // ── Request helpers ──────────────────────────────────────────────

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.inner.token.load().as_deref() {
            Some(token) => req.bearer_auth(&token.token),
            None => req,
        }
    }

    /// Send a GET, returning the raw response (status not yet checked).
    pub(crate) async fn get_raw(&self, url: Url) -> Result<reqwest::Response, Error> {
        debug!("GET {url}");
        self.authorize(self.inner.http.get(url))
            .send()
            .await
            .map_err(Error::Transport)
    }

    /// GET a relative path with query parameters; parse the JSON body.
    pub(crate) async fn get_json(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Value, Error> {
        let url = self.url(path)?;
        debug!("GET {url} params={params:?}");

        let resp = self
            .authorize(self.inner.http.get(url).query(params))
            .send()
            .await
            .map_err(Error::Transport)?;

        Self::handle_json(resp).await
    }

    /// GET an absolute URL (used for server-provided dereference links).
    pub(crate) async fn get_json_absolute(&self, raw: &str) -> Result<Value, Error> {
        let url = Url::parse(raw)?;
        let resp = self.get_raw(url).await?;
        Self::handle_json(resp).await
    }

    /// Status-check a response and parse its JSON body.
    pub(crate) async fn handle_json(resp: reqwest::Response) -> Result<Value, Error> {
        let status = resp.status();
        let body = resp.text().await.map_err(Error::Transport)?;

        if !status.is_success() {
            return Err(Error::HttpStatus { status: status.as_u16(), body });
        }

        serde_json::from_str(&body).map_err(|e| {
            let preview = &body[..body.len().min(200)];
            Error::Parsing {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    }

    /// Status-check a response whose body we don't need.
    pub(crate) async fn handle_empty(resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(Error::HttpStatus { status: status.as_u16(), body })
        }
    }

    /// Send a PATCH with a JSON body; only the status matters.
    pub(crate) async fn patch_empty(
        &self,
        url: Url,
        body: &impl serde::Serialize,
    ) -> Result<(), Error> {
        debug!("PATCH {url}");

        let resp = self
            .authorize(self.inner.http.patch(url).json(body))
            .send()
            .await
            .map_err(Error::Transport)?;

        Self::handle_empty(resp).await
    }

    /// Send a PUT with a JSON body; only the status matters.
    pub(crate) async fn put_empty(
        &self,
        url: Url,
        body: &impl serde::Serialize,
    ) -> Result<(), Error> {
        debug!("PUT {url}");

        let resp = self
            .authorize(self.inner.http.put(url).json(body))
            .send()
            .await
            .map_err(Error::Transport)?;

        Self::handle_empty(resp).await
    }
}

impl std::fmt::Debug for BasClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("locale", &self.inner.locale)
            .field("authenticated", &self.inner.token.load().is_some())
            .finish_non_exhaustive()
    }
}
