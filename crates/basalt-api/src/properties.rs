// Property I/O: single and multi attribute reads and writes, commands.
//
// Multi-object operations fan out one request per (object, attribute)
// pair -- per-attribute fetches are much cheaper server-side than whole
// object reads -- and join on a wait-for-all barrier before correlating
// results back by object id. Completion order is never relied on.

use futures::future::join_all;
use serde_json::{Map, Value, json};
use tracing::debug;
use uuid::Uuid;

use crate::client::BasClient;
use crate::error::Error;
use crate::variant::{Variant, VariantBundle};

impl BasClient {
    /// Read one attribute of one object.
    ///
    /// Returns `Ok(None)` when the server answers 404 -- an absent object
    /// or attribute is an expected outcome, not an error. Any other
    /// non-success status is [`Error::HttpStatus`]; a success body missing
    /// `item.{attribute}` is [`Error::Property`].
    pub async fn read_property(
        &self,
        id: Uuid,
        attribute: &str,
    ) -> Result<Option<Variant>, Error> {
        let url = self.url(&format!("objects/{id}/attributes/{attribute}"))?;
        let resp = self.get_raw(url).await?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        if !status.is_success() {
            return Err(Error::HttpStatus { status: status.as_u16(), body });
        }

        let value: Value = serde_json::from_str(&body).map_err(|e| Error::Property {
            message: e.to_string(),
            body: body.clone(),
        })?;
        let payload = value
            .get("item")
            .and_then(|item| item.get(attribute))
            .ok_or_else(|| Error::Property {
                message: format!("response missing item.{attribute}"),
                body: value.to_string(),
            })?;

        Ok(Some(Variant::normalize(
            self.translator(),
            self.locale(),
            id,
            attribute,
            Some(payload),
        )))
    }

    /// Read many attributes across many objects concurrently.
    ///
    /// One request per (id, attribute) pair; all requests are attempted
    /// regardless of individual outcomes. Per-attribute 404s are silently
    /// dropped; an id whose every attribute resolved to 404 is omitted
    /// from the result. If `attributes` is empty, every id yields an empty
    /// bundle instead. Any non-404 failure fails the whole batch -- the
    /// error surfaced is the first failure in (id, attribute) submission
    /// order.
    pub async fn read_property_multiple(
        &self,
        ids: &[Uuid],
        attributes: &[&str],
    ) -> Result<Vec<VariantBundle>, Error> {
        let mut requests = Vec::with_capacity(ids.len() * attributes.len());
        for id in ids {
            for attribute in attributes {
                requests.push(self.read_property(*id, attribute));
            }
        }

        debug!("reading {} attribute(s) across {} object(s)", requests.len(), ids.len());
        let outcomes = join_all(requests).await;

        let mut resolved: Vec<Variant> = Vec::new();
        let mut first_failure = None;
        for outcome in outcomes {
            match outcome {
                Ok(Some(variant)) => resolved.push(variant),
                Ok(None) => {}
                Err(e) => {
                    if first_failure.is_none() {
                        first_failure = Some(e);
                    }
                }
            }
        }
        if let Some(e) = first_failure {
            return Err(e);
        }

        let mut bundles = Vec::new();
        for id in ids {
            let variants: Vec<Variant> =
                resolved.iter().filter(|v| v.id == *id).cloned().collect();
            if !variants.is_empty() || attributes.is_empty() {
                bundles.push(VariantBundle { id: *id, variants });
            }
        }
        Ok(bundles)
    }

    /// Write one attribute of one object.
    ///
    /// `priority` is an optional `writePriorityEnumSet` key applied to
    /// the write.
    pub async fn write_property(
        &self,
        id: Uuid,
        attribute: &str,
        value: Value,
        priority: Option<&str>,
    ) -> Result<(), Error> {
        let item = write_body(&[(attribute.to_owned(), value)], priority);
        self.write_request(id, &item).await
    }

    /// Write the same attribute/value pairs to many objects concurrently.
    ///
    /// One shared body, one request per id; all requests are attempted and
    /// awaited. Any individual failure fails the overall call -- the error
    /// surfaced is the first failure in id order.
    pub async fn write_property_multiple(
        &self,
        ids: &[Uuid],
        values: &[(String, Value)],
        priority: Option<&str>,
    ) -> Result<(), Error> {
        let item = write_body(values, priority);

        let requests: Vec<_> = ids.iter().map(|id| self.write_request(*id, &item)).collect();
        debug!("writing {} attribute(s) to {} object(s)", values.len(), ids.len());

        for outcome in join_all(requests).await {
            outcome?;
        }
        Ok(())
    }

    /// Send a command to an object, with a JSON array of argument values.
    pub async fn send_command(
        &self,
        id: Uuid,
        command: &str,
        values: &[Value],
    ) -> Result<(), Error> {
        let url = self.url(&format!("objects/{id}/commands/{command}"))?;
        self.put_empty(url, &values).await
    }

    async fn write_request(&self, id: Uuid, item: &Map<String, Value>) -> Result<(), Error> {
        let url = self.url(&format!("objects/{id}"))?;
        self.patch_empty(url, &json!({ "item": item })).await
    }
}

/// Build the shared `{<attr>: <value>, ..., priority?}` write body.
fn write_body(values: &[(String, Value)], priority: Option<&str>) -> Map<String, Value> {
    let mut item = Map::new();
    for (attribute, value) in values {
        item.insert(attribute.clone(), value.clone());
    }
    if let Some(priority) = priority {
        item.insert("priority".to_owned(), Value::String(priority.to_owned()));
    }
    item
}
