use thiserror::Error;

/// Top-level error type for the `basalt-api` crate.
///
/// Covers every failure mode across the client: transport, authentication,
/// and the various "server answered but the body is not what it should be"
/// cases. Parsing-class variants carry the offending payload so callers can
/// log exactly what the server sent.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS configuration or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Server responses ────────────────────────────────────────────
    /// Non-2xx status from the server. The 404-on-read case never surfaces
    /// here -- single-attribute reads resolve it to `None` instead.
    #[error("Server returned HTTP {status}")]
    HttpStatus { status: u16, body: String },

    // ── Authentication ──────────────────────────────────────────────
    /// The login/refresh response did not contain a usable access token.
    /// The previously held credential (if any) is left untouched.
    #[error("Malformed access token response")]
    Token { body: String },

    // ── Data ────────────────────────────────────────────────────────
    /// A single-attribute read succeeded at the HTTP level but the body
    /// is missing the expected `item.{attribute}` structure.
    #[error("Malformed attribute response: {message}")]
    Property { message: String, body: String },

    /// A paginated list response is missing expected fields
    /// (`items`, `total`, ...).
    #[error("Malformed list response: {message}")]
    Parsing { message: String, body: String },

    /// A type-catalog dereference returned a payload without the expected
    /// `id`/`description` fields.
    #[error("Malformed object type response")]
    ObjectType { body: String },

    /// An object identifier could not be parsed as a UUID.
    #[error("Unparsable object identifier: {value}")]
    Identifier { value: String },
}

impl Error {
    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::HttpStatus { status: 404, .. } => true,
            _ => false,
        }
    }

    /// The HTTP status code, when this error carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The raw server payload, for the variants that capture it.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::HttpStatus { body, .. }
            | Self::Token { body }
            | Self::Property { body, .. }
            | Self::Parsing { body, .. }
            | Self::ObjectType { body } => Some(body),
            _ => None,
        }
    }
}
