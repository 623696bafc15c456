// basalt-api: Async Rust client for building-automation server REST APIs.
//
// Turns the server's raw JSON surface into a typed, localized object
// model: session lifecycle with pre-expiry token refresh, concurrent
// multi-object attribute reads/writes, recursive paginated tree
// traversal, and enumeration translation with deterministic fallback.

pub mod client;
pub mod error;
pub mod locale;
pub mod objects;
pub mod properties;
pub mod session;
pub mod transport;
pub mod variant;

pub use client::{ApiVersion, BasClient};
pub use error::Error;
pub use locale::{DEFAULT_LOCALE, EnumTranslator, LocaleProvider, MapLocaleProvider};
pub use objects::{ObjectNode, TypeDescriptor};
pub use session::AccessToken;
pub use transport::{TlsMode, TransportConfig};
pub use variant::{PRESENT_VALUE, RELIABLE, Variant, VariantBundle, VariantKind};
