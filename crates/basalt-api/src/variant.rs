// Attribute value normalization.
//
// The server returns attribute values in several wire shapes: bare numbers,
// enumeration keys as strings, booleans, arrays, and (for presentValue) a
// composite object carrying reliability/priority metadata next to the
// value. Everything funnels into one tagged Variant snapshot.

use serde_json::Value;
use uuid::Uuid;

use crate::locale::EnumTranslator;

/// Enumeration key reported when a value is reliable. Also the default
/// reliability for every attribute other than a presentValue composite.
pub const RELIABLE: &str = "reliabilityEnumSet.reliable";

const UNSUPPORTED: &str = "statusEnumSet.unsupportedObjectType";
const ARRAY: &str = "dataTypeEnumSet.arrayDataType";

/// The distinguished attribute carrying an object's live value plus
/// reliability/priority metadata.
pub const PRESENT_VALUE: &str = "presentValue";

/// Tag identifying the shape of a normalized attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantKind {
    Numeric,
    String,
    Boolean,
    Array,
    Unsupported,
}

/// A normalized attribute value from a single object.
///
/// Immutable snapshot of one server response. `children` is `Some` exactly
/// when `kind` is [`VariantKind::Array`], holding one recursively
/// normalized variant per element.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    /// Id of the object the attribute was read from.
    pub id: Uuid,
    /// Name of the attribute.
    pub attribute: String,
    pub kind: VariantKind,
    /// Numeric representation; 0 for strings and arrays.
    pub numeric: f64,
    /// Localized display string.
    pub display: String,
    /// Pre-translation enumeration key, when the value was an enumeration
    /// key candidate (string, array, or unsupported placeholder).
    pub enum_key: Option<String>,
    /// Boolean representation; true iff the numeric value is non-zero.
    pub boolean: bool,
    /// Element variants; `Some` iff `kind == Array`.
    pub children: Option<Vec<Variant>>,
    /// Reliability enumeration key; [`RELIABLE`] unless a presentValue
    /// composite said otherwise.
    pub reliability_key: String,
    /// Localized reliability display string.
    pub reliability: String,
    /// Priority enumeration key; only set by a presentValue composite.
    pub priority_key: Option<String>,
    /// Localized priority display string.
    pub priority: Option<String>,
}

impl Variant {
    /// Whether the reported reliability is the "reliable" enumeration.
    pub fn is_reliable(&self) -> bool {
        self.reliability_key == RELIABLE
    }

    /// Normalize one raw attribute payload.
    ///
    /// `payload` is the value found under `item.{attribute}` in the server
    /// response; `None` means the field was absent.
    pub(crate) fn normalize(
        translator: &EnumTranslator,
        locale: &str,
        id: Uuid,
        attribute: &str,
        payload: Option<&Value>,
    ) -> Self {
        let mut variant = Self {
            id,
            attribute: attribute.to_owned(),
            kind: VariantKind::Unsupported,
            numeric: 1.0,
            display: String::new(),
            enum_key: None,
            boolean: false,
            children: None,
            reliability_key: RELIABLE.to_owned(),
            reliability: translator.localize(RELIABLE, locale),
            priority_key: None,
            priority: None,
        };
        variant.classify(translator, locale, payload);
        variant
    }

    // First matching rule wins; composites recurse through this same
    // dispatch for their nested value.
    fn classify(&mut self, translator: &EnumTranslator, locale: &str, payload: Option<&Value>) {
        match payload {
            None | Some(Value::Null) => self.mark_unsupported(translator, locale),
            Some(Value::Number(n)) => {
                let numeric = n.as_f64().unwrap_or(0.0);
                self.kind = VariantKind::Numeric;
                self.numeric = numeric;
                self.display = numeric.to_string();
                self.boolean = numeric != 0.0;
            }
            Some(Value::String(s)) => {
                // Strings are enumeration key candidates; unknown keys
                // fall through localize unchanged.
                self.kind = VariantKind::String;
                self.numeric = 0.0;
                self.enum_key = Some(s.clone());
                self.display = translator.localize(s, locale);
            }
            Some(Value::Bool(b)) => {
                self.kind = VariantKind::Boolean;
                self.numeric = f64::from(u8::from(*b));
                self.boolean = *b;
                self.display = b.to_string();
            }
            Some(Value::Array(items)) => {
                let (id, attribute) = (self.id, self.attribute.clone());
                self.children = Some(
                    items
                        .iter()
                        .map(|item| Self::normalize(translator, locale, id, &attribute, Some(item)))
                        .collect(),
                );
                self.kind = VariantKind::Array;
                self.numeric = 0.0;
                self.enum_key = Some(ARRAY.to_owned());
                self.display = translator.localize(ARRAY, locale);
            }
            Some(Value::Object(map)) => self.classify_composite(translator, locale, map),
        }
    }

    // Composite objects are valid only on presentValue: reliability and
    // priority override the defaults, then the nested value goes back
    // through classification. On any other attribute the composite is
    // unsupported.
    fn classify_composite(
        &mut self,
        translator: &EnumTranslator,
        locale: &str,
        map: &serde_json::Map<String, Value>,
    ) {
        if self.attribute != PRESENT_VALUE {
            self.mark_unsupported(translator, locale);
            return;
        }

        if let Some(reliability) = map.get("reliability") {
            let key = enum_key_of(reliability);
            self.reliability = translator.localize(&key, locale);
            self.reliability_key = key;
        }
        if let Some(priority) = map.get("priority") {
            let key = enum_key_of(priority);
            self.priority = Some(translator.localize(&key, locale));
            self.priority_key = Some(key);
        }

        self.classify(translator, locale, map.get("value"));
    }

    fn mark_unsupported(&mut self, translator: &EnumTranslator, locale: &str) {
        self.kind = VariantKind::Unsupported;
        self.enum_key = Some(UNSUPPORTED.to_owned());
        self.display = translator.localize(UNSUPPORTED, locale);
    }
}

/// All variants resolved for one object in a multi-read.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantBundle {
    pub id: Uuid,
    pub variants: Vec<Variant>,
}

fn enum_key_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
