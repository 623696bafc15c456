// Enumeration translation.
//
// The server addresses enumeration members by dotted key
// (`reliabilityEnumSet.reliable`) and the client renders them as localized
// display strings. Translation data comes from an injected LocaleProvider,
// so resource storage/loading stays outside this crate and tests can
// substitute their own tables.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};

/// Locale used as the fallback step of every lookup, and as the source
/// language for reverse lookups.
pub const DEFAULT_LOCALE: &str = "en-US";

const COMMAND_PREFIX: &str = "commandIdEnumSet.";
const OBJECT_TYPE_PREFIX: &str = "objectTypeEnumSet.";

/// Source of enumeration translation data.
///
/// `entries` must return the full resource set for a locale in an order
/// that is stable for the lifetime of the process -- the reverse tables
/// are built from a single scan and collisions are resolved first-seen.
pub trait LocaleProvider: Send + Sync {
    /// Look up the display string for `key` in `locale`.
    fn lookup(&self, key: &str, locale: &str) -> Option<String>;

    /// All `(key, display)` pairs for `locale`, in stable order.
    fn entries(&self, locale: &str) -> Vec<(String, String)>;
}

/// In-memory [`LocaleProvider`] backed by `BTreeMap`s.
///
/// Key order is lexicographic, which satisfies the stable-scan requirement.
#[derive(Debug, Default, Clone)]
pub struct MapLocaleProvider {
    tables: BTreeMap<String, BTreeMap<String, String>>,
}

impl MapLocaleProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one translation entry.
    pub fn insert(
        &mut self,
        locale: impl Into<String>,
        key: impl Into<String>,
        display: impl Into<String>,
    ) {
        self.tables
            .entry(locale.into())
            .or_default()
            .insert(key.into(), display.into());
    }
}

impl LocaleProvider for MapLocaleProvider {
    fn lookup(&self, key: &str, locale: &str) -> Option<String> {
        self.tables.get(locale)?.get(key).cloned()
    }

    fn entries(&self, locale: &str) -> Vec<(String, String)> {
        self.tables
            .get(locale)
            .map(|table| {
                table
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Reverse lookup tables, display string -> enumeration key.
///
/// The objectType namespace needs two maps: its display strings are not
/// unique, and a colliding second occurrence overflows into the secondary
/// map instead of clobbering the first-seen entry.
struct ReverseTables {
    commands: HashMap<String, String>,
    object_types: HashMap<String, String>,
    object_types_overflow: HashMap<String, String>,
}

impl ReverseTables {
    fn build(provider: &dyn LocaleProvider, locale: &str) -> Self {
        let mut commands = HashMap::new();
        let mut object_types = HashMap::new();
        let mut object_types_overflow = HashMap::new();

        for (key, display) in provider.entries(locale) {
            if key.starts_with(COMMAND_PREFIX) {
                commands.entry(display).or_insert(key);
            } else if key.starts_with(OBJECT_TYPE_PREFIX) {
                match object_types.entry(display) {
                    std::collections::hash_map::Entry::Vacant(slot) => {
                        slot.insert(key);
                    }
                    std::collections::hash_map::Entry::Occupied(slot) => {
                        object_types_overflow
                            .entry(slot.key().clone())
                            .or_insert(key);
                    }
                }
            }
        }

        Self {
            commands,
            object_types,
            object_types_overflow,
        }
    }
}

/// Locale-aware enumeration translator.
///
/// Cheap to clone; clones share the provider and the lazily built reverse
/// tables. Each translator instance owns its own tables -- there is no
/// process-wide cache -- so tests can isolate instances freely.
#[derive(Clone)]
pub struct EnumTranslator {
    provider: Arc<dyn LocaleProvider>,
    default_locale: String,
    reverse: Arc<OnceLock<ReverseTables>>,
}

impl std::fmt::Debug for EnumTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnumTranslator")
            .field("default_locale", &self.default_locale)
            .finish_non_exhaustive()
    }
}

impl EnumTranslator {
    /// Create a translator with the standard default locale (`en-US`).
    pub fn new(provider: Arc<dyn LocaleProvider>) -> Self {
        Self::with_default_locale(provider, DEFAULT_LOCALE)
    }

    /// Create a translator with a custom default (fallback) locale.
    pub fn with_default_locale(
        provider: Arc<dyn LocaleProvider>,
        default_locale: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            default_locale: default_locale.into(),
            reverse: Arc::new(OnceLock::new()),
        }
    }

    /// A translator with no translation data; every lookup echoes its key.
    pub fn empty() -> Self {
        Self::new(Arc::new(MapLocaleProvider::new()))
    }

    /// Localize an enumeration key.
    ///
    /// Three-step fallback: requested locale, then the default locale, then
    /// the key itself unchanged. Never fails.
    pub fn localize(&self, key: &str, locale: &str) -> String {
        self.provider
            .lookup(key, locale)
            .or_else(|| self.provider.lookup(key, &self.default_locale))
            .unwrap_or_else(|| key.to_owned())
    }

    /// Resolve a default-locale command display string back to its
    /// enumeration key. Unknown input is returned unchanged.
    pub fn reverse_command(&self, display: &str) -> String {
        self.tables()
            .commands
            .get(display)
            .cloned()
            .unwrap_or_else(|| display.to_owned())
    }

    /// Resolve a default-locale objectType display string back to its
    /// enumeration key, checking the primary map then the collision
    /// overflow. Unknown input is returned unchanged.
    pub fn reverse_object_type(&self, display: &str) -> String {
        let tables = self.tables();
        tables
            .object_types
            .get(display)
            .or_else(|| tables.object_types_overflow.get(display))
            .cloned()
            .unwrap_or_else(|| display.to_owned())
    }

    // Built at most once even under concurrent first use; reads after
    // initialization need no synchronization.
    fn tables(&self) -> &ReverseTables {
        self.reverse
            .get_or_init(|| ReverseTables::build(self.provider.as_ref(), &self.default_locale))
    }
}
