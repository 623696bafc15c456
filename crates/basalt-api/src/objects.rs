// Object tree traversal and device/type catalogs.
//
// List endpoints are paginated with a `{items, total, next}` envelope;
// the page counter starts at 1 and advances while `next` is non-null.
// Tree traversal recurses depth-first with an explicit level budget, so
// termination is guaranteed by construction.

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::client::BasClient;
use crate::error::Error;

/// One node of the server's object tree.
///
/// Snapshot of a single list item, optionally with recursively fetched
/// children attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectNode {
    /// Object id; nil when the server's id field was absent or unparsable.
    pub id: Uuid,
    /// Human-readable hierarchical path, distinct from the id.
    pub item_reference: String,
    pub name: String,
    pub description: String,
    /// Direct children, when a traversal fetched them.
    pub children: Option<Vec<ObjectNode>>,
    /// Number of direct children, or -1 when children were not fetched.
    /// 0 means "fetched, none found".
    pub children_count: i32,
}

impl ObjectNode {
    fn from_item(item: &Value, children: Option<Vec<ObjectNode>>) -> Self {
        let children_count = children
            .as_ref()
            .map_or(-1, |c| i32::try_from(c.len()).unwrap_or(i32::MAX));

        Self {
            id: item
                .get("id")
                .and_then(Value::as_str)
                .and_then(|raw| Uuid::try_parse(raw).ok())
                .unwrap_or(Uuid::nil()),
            item_reference: str_field(item, "itemReference"),
            name: str_field(item, "name"),
            description: str_field(item, "description"),
            children,
            children_count,
        }
    }
}

/// A network device type from the server's type catalog, with its
/// enumeration key and localized label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub id: i64,
    /// `objectTypeEnumSet` key resolved from the server's description,
    /// or the raw description when no enumeration matches.
    pub key: String,
    /// Localized label; falls back to the server's raw description when
    /// no translation exists for the key.
    pub label: String,
}

impl BasClient {
    /// Fetch the children of `id`, `levels` deep.
    ///
    /// `levels < 1` yields an empty result (not an error); `levels == 1`
    /// fetches immediate children only, leaving `children_count == -1` on
    /// every node. Deeper traversals attach recursively fetched children
    /// with real counts. A child whose id cannot be parsed is still
    /// emitted -- without recursive children -- and traversal continues
    /// with its siblings.
    pub async fn get_objects(&self, id: Uuid, levels: i32) -> Result<Vec<ObjectNode>, Error> {
        self.get_objects_inner(id, levels).await
    }

    // Recursive; boxed so the future has a fixed size.
    fn get_objects_inner(
        &self,
        id: Uuid,
        levels: i32,
    ) -> BoxFuture<'_, Result<Vec<ObjectNode>, Error>> {
        Box::pin(async move {
            if levels < 1 {
                return Ok(Vec::new());
            }

            let mut nodes = Vec::new();
            let mut page = 1;

            loop {
                let value = self
                    .get_json(
                        &format!("objects/{id}/objects"),
                        &[("page", page.to_string())],
                    )
                    .await?;

                let total = require_i64(&value, "total")?;
                let mut has_next = false;

                if total > 0 {
                    for item in require_items(&value)? {
                        let children = if levels - 1 > 0 {
                            match child_id(item) {
                                Some(child) => {
                                    Some(self.get_objects_inner(child, levels - 1).await?)
                                }
                                // Unparsable id: emit the node, skip recursion.
                                None => None,
                            }
                        } else {
                            None
                        };
                        nodes.push(ObjectNode::from_item(item, children));
                    }
                    has_next = value.get("next").is_some_and(|next| !next.is_null());
                }

                if has_next {
                    page += 1;
                } else {
                    break;
                }
            }

            debug!("fetched {} object(s) under {id}", nodes.len());
            Ok(nodes)
        })
    }

    /// List all network devices, optionally filtered by type number,
    /// draining every page. No recursion.
    pub async fn get_network_devices(
        &self,
        type_filter: Option<&str>,
    ) -> Result<Vec<ObjectNode>, Error> {
        let mut devices = Vec::new();
        let mut page = 1;

        loop {
            let mut params = vec![("page", page.to_string())];
            if let Some(filter) = type_filter {
                params.push(("type", filter.to_owned()));
            }

            let value = self.get_json("networkDevices", &params).await?;

            for item in require_items(&value)? {
                devices.push(ObjectNode::from_item(item, None));
            }

            if value.get("next").is_some_and(|next| !next.is_null()) {
                page += 1;
            } else {
                break;
            }
        }

        Ok(devices)
    }

    /// List the available network device types.
    ///
    /// Two-stage: the catalog endpoint returns type references which are
    /// then dereferenced one at a time (the catalog is small and the
    /// server throttles bursts against it). Each resolved description is
    /// matched back to its `objectTypeEnumSet` key and localized, falling
    /// back to the raw description when no translation exists.
    pub async fn get_network_device_types(&self) -> Result<Vec<TypeDescriptor>, Error> {
        let value = self.get_json("networkDevices/availableTypes", &[]).await?;

        let mut types = Vec::new();
        for item in require_items(&value)? {
            let type_url = item
                .get("typeUrl")
                .and_then(Value::as_str)
                .ok_or_else(|| Error::Parsing {
                    message: "type reference missing typeUrl".to_owned(),
                    body: value.to_string(),
                })?;

            types.push(self.dereference_type(type_url).await?);
        }

        Ok(types)
    }

    async fn dereference_type(&self, type_url: &str) -> Result<TypeDescriptor, Error> {
        let value = self.get_json_absolute(type_url).await?;
        let malformed = || Error::ObjectType { body: value.to_string() };

        let description = value
            .get("description")
            .and_then(Value::as_str)
            .ok_or_else(malformed)?;
        let id = value.get("id").and_then(Value::as_i64).ok_or_else(malformed)?;

        let key = self.translator().reverse_object_type(description);
        let translation = self.translator().localize(&key, self.locale());
        let label = if translation == key {
            // No translation found; keep the server's wording.
            description.to_owned()
        } else {
            translation
        };

        Ok(TypeDescriptor { id, key, label })
    }

    /// Resolve an item reference (hierarchical path) to an object id.
    ///
    /// The reference is URL-encoded automatically. A body that is not a
    /// UUID string is [`Error::Identifier`] carrying the raw value.
    pub async fn get_object_identifier(&self, item_reference: &str) -> Result<Uuid, Error> {
        let value = self
            .get_json("objectIdentifiers", &[("fqr", item_reference.to_owned())])
            .await?;

        let raw = value.as_str().ok_or_else(|| Error::Identifier {
            value: value.to_string(),
        })?;
        Uuid::try_parse(raw).map_err(|_| Error::Identifier { value: raw.to_owned() })
    }
}

fn str_field(item: &Value, field: &str) -> String {
    item.get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

fn child_id(item: &Value) -> Option<Uuid> {
    item.get("id")
        .and_then(Value::as_str)
        .and_then(|raw| Uuid::try_parse(raw).ok())
}

fn require_items(value: &Value) -> Result<&Vec<Value>, Error> {
    value
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Parsing {
            message: "list response missing items".to_owned(),
            body: value.to_string(),
        })
}

fn require_i64(value: &Value, field: &str) -> Result<i64, Error> {
    value
        .get(field)
        .and_then(Value::as_i64)
        .ok_or_else(|| Error::Parsing {
            message: format!("list response missing {field}"),
            body: value.to_string(),
        })
}
