//! Prerequisite object lookup.
//!
//! Some operations need object ids the caller does not know up front, such
//! as the shared state behind a pointer object. Each [`PrerequisiteObjectSpec`]
//! names a type tag to look for among an owner's objects; the match is
//! injected into the argument bag before any command is built.

use std::collections::HashSet;

use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::arguments::Arguments;
use crate::client::{OwnedObject, PtbClient};
use crate::config::PrerequisiteObjectSpec;
use crate::context::CallContext;
use crate::error::{PtbError, PtbResult};

pub struct PrerequisiteResolver<'a> {
    client: &'a dyn PtbClient,
}

impl<'a> PrerequisiteResolver<'a> {
    pub fn new(client: &'a dyn PtbClient) -> Self {
        Self { client }
    }

    /// Resolve every spec in order, writing results into `arguments`.
    ///
    /// With `set_keys` the matched object's content fields become arguments;
    /// otherwise its id is stored under the prerequisite's name. An entry with no
    /// owner searches `owner_fallback`. When nothing matches the arguments are
    /// left as they are.
    pub async fn resolve(
        &self,
        ctx: &CallContext,
        specs: &[PrerequisiteObjectSpec],
        arguments: &mut Arguments,
        owner_fallback: Option<&str>,
    ) -> PtbResult<()> {
        for spec in specs {
            let owner = spec
                .owner_id
                .as_deref()
                .or(owner_fallback)
                .ok_or_else(|| PtbError::MissingRequiredParameter {
                    parameter: format!("{}.owner_id", spec.name),
                    command_index: None,
                })?;

            let mut matches = self.find_all(ctx, owner, &spec.tag).await?;
            if matches.is_empty() {
                debug!(prerequisite = %spec.name, tag = %spec.tag, owner, "no owned object matches");
                continue;
            }
            matches.sort_by(|a, b| a.object_id.cmp(&b.object_id));

            if spec.set_keys {
                if matches.len() > 1 {
                    warn!(
                        prerequisite = %spec.name,
                        count = matches.len(),
                        "multiple objects match, merging fields in object id order"
                    );
                }
                for object in matches {
                    for (key, value) in object.fields {
                        arguments.insert(key, value);
                    }
                }
            } else {
                if matches.len() > 1 {
                    let ids: Vec<&str> = matches.iter().map(|o| o.object_id.as_str()).collect();
                    return Err(PtbError::invalid_shape(
                        spec.name.clone(),
                        format!(
                            "{} objects of type {} match: {}",
                            ids.len(),
                            spec.tag,
                            ids.join(", ")
                        ),
                    ));
                }
                let object = matches.remove(0);
                debug!(prerequisite = %spec.name, object_id = %object.object_id, "resolved prerequisite");
                arguments.insert(spec.name.clone(), JsonValue::String(object.object_id));
            }
        }
        Ok(())
    }

    /// All objects owned by `owner` whose type contains `tag`, across every page.
    async fn find_all(
        &self,
        ctx: &CallContext,
        owner: &str,
        tag: &str,
    ) -> PtbResult<Vec<OwnedObject>> {
        let mut found = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = None;
        loop {
            let page = ctx
                .run(
                    "list_owned_objects",
                    self.client.list_owned_objects(ctx, owner, cursor.take()),
                )
                .await?;
            found.extend(
                page.data
                    .into_iter()
                    .filter(|obj| obj.object_type.contains(tag)),
            );
            match page.next_cursor {
                Some(next) if seen.insert(next.clone()) => cursor = Some(next),
                Some(next) => {
                    warn!(owner, cursor = %next, "owned object cursor repeated, stopping");
                    return Ok(found);
                }
                None => return Ok(found),
            }
        }
    }
}
