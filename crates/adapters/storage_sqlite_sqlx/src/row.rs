//! Row mapping between the `resource` / `resource_history` tables and domain types.

use std::collections::BTreeMap;
use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use unistore_domain::history::{Action, HistoryEntry};
use unistore_domain::id::ResourceGuid;
use unistore_domain::resource::{Origin, Resource, ResourceKey, ResourceKind};
use unistore_domain::time::{self, Timestamp};

use crate::dialect::{Columns, Condition, SqlValue};
use crate::error::StorageError;

pub(crate) const RESOURCE: &str = "resource";
pub(crate) const HISTORY: &str = "resource_history";
pub(crate) const LABEL: &str = "resource_label";
pub(crate) const REFERENCE: &str = "resource_reference";

/// Wrapper for converting database rows into domain types without polluting
/// domain structs with database concerns.
pub(crate) struct Wrapper(pub Resource);

impl Wrapper {
    pub(crate) fn maybe(value: Option<Self>) -> Option<Resource> {
        value.map(|w| w.0)
    }
}

fn decode_error(err: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}

fn decode_time(value: &str) -> Result<Timestamp, sqlx::Error> {
    time::parse(value).map_err(decode_error)
}

fn decode_map(value: &str) -> Result<BTreeMap<String, String>, sqlx::Error> {
    serde_json::from_str(value).map_err(decode_error)
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let guid: String = row.try_get("guid")?;
        let labels_json: String = row.try_get("labels")?;
        let fields_json: String = row.try_get("fields")?;
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;
        let origin_source: Option<String> = row.try_get("origin_source")?;
        let origin_key: Option<String> = row.try_get("origin_key")?;
        let origin_time: Option<String> = row.try_get("origin_time")?;

        let origin = match origin_source {
            Some(source) => Some(Origin {
                source,
                key: origin_key.unwrap_or_default(),
                time: origin_time.as_deref().map(decode_time).transpose()?,
            }),
            None => None,
        };

        Ok(Self(Resource {
            guid: ResourceGuid::from_str(&guid).map_err(decode_error)?,
            key: ResourceKey::new(
                row.try_get::<String, _>("namespace")?,
                row.try_get::<String, _>("group")?,
                row.try_get::<String, _>("resource")?,
                row.try_get::<String, _>("name")?,
            ),
            group_version: row.try_get("group_version")?,
            folder: row.try_get("folder")?,
            version: row.try_get("version")?,
            size: row.try_get("size")?,
            etag: row.try_get("etag")?,
            body: row.try_get("body")?,
            meta: row.try_get("meta")?,
            status: row.try_get("status")?,
            labels: decode_map(&labels_json)?,
            fields: decode_map(&fields_json)?,
            created_at: decode_time(&created_at)?,
            created_by: row.try_get("created_by")?,
            updated_at: decode_time(&updated_at)?,
            updated_by: row.try_get("updated_by")?,
            origin,
            message: row.try_get("message")?,
        }))
    }
}

/// A `resource_history` row.
pub(crate) struct HistoryWrapper(pub HistoryEntry);

impl<'r> FromRow<'r, SqliteRow> for HistoryWrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let code: i64 = row.try_get("action")?;
        let action = Action::from_code(code)
            .ok_or_else(|| sqlx::Error::Decode(format!("unknown history action {code}").into()))?;

        Ok(Self(HistoryEntry {
            action,
            previous_version: row.try_get("previous_version")?,
            resource: Wrapper::from_row(row)?.0,
        }))
    }
}

pub(crate) fn key_filter(key: &ResourceKey) -> Vec<Condition> {
    vec![
        Condition::eq("namespace", key.namespace.as_str()),
        Condition::eq("group", key.group.as_str()),
        Condition::eq("resource", key.resource.as_str()),
        Condition::eq("name", key.name.as_str()),
    ]
}

pub(crate) fn kind_filter(kind: &ResourceKind) -> Vec<Condition> {
    vec![
        Condition::eq("namespace", kind.namespace.as_str()),
        Condition::eq("group", kind.group.as_str()),
        Condition::eq("resource", kind.resource.as_str()),
    ]
}

/// Every column of a `resource` row.
pub(crate) fn resource_columns(resource: &Resource) -> Result<Columns, StorageError> {
    let origin = resource.origin.as_ref();
    Ok(vec![
        ("guid", SqlValue::from(resource.guid.to_string())),
        ("namespace", SqlValue::from(resource.key.namespace.as_str())),
        ("group", SqlValue::from(resource.key.group.as_str())),
        ("resource", SqlValue::from(resource.key.resource.as_str())),
        ("name", SqlValue::from(resource.key.name.as_str())),
        ("group_version", SqlValue::from(resource.group_version.as_str())),
        ("folder", SqlValue::from(resource.folder.as_deref())),
        ("version", SqlValue::from(resource.version)),
        ("size", SqlValue::from(resource.size)),
        ("etag", SqlValue::from(resource.etag.as_str())),
        ("body", SqlValue::from(resource.body.clone())),
        ("meta", SqlValue::from(resource.meta.clone())),
        ("status", SqlValue::from(resource.status.clone())),
        ("labels", SqlValue::from(serde_json::to_string(&resource.labels)?)),
        ("fields", SqlValue::from(serde_json::to_string(&resource.fields)?)),
        ("created_at", SqlValue::from(resource.created_at.to_rfc3339())),
        ("created_by", SqlValue::from(resource.created_by.as_str())),
        ("updated_at", SqlValue::from(resource.updated_at.to_rfc3339())),
        ("updated_by", SqlValue::from(resource.updated_by.as_str())),
        ("origin_source", SqlValue::from(origin.map(|o| o.source.as_str()))),
        ("origin_key", SqlValue::from(origin.map(|o| o.key.as_str()))),
        (
            "origin_time",
            SqlValue::from(origin.and_then(|o| o.time).map(|t| t.to_rfc3339())),
        ),
        ("message", SqlValue::from(resource.message.as_str())),
    ])
}

/// The columns an update may change: everything but the key, guid and creation columns.
pub(crate) fn mutable_columns(resource: &Resource) -> Result<Columns, StorageError> {
    const IMMUTABLE: [&str; 7] = [
        "guid",
        "namespace",
        "group",
        "resource",
        "name",
        "created_at",
        "created_by",
    ];
    Ok(resource_columns(resource)?
        .into_iter()
        .filter(|(column, _)| !IMMUTABLE.contains(column))
        .collect())
}

/// Every column of a `resource_history` row.
pub(crate) fn history_columns(
    resource: &Resource,
    action: Action,
    previous_version: Option<i64>,
) -> Result<Columns, StorageError> {
    let mut columns = resource_columns(resource)?;
    columns.push(("action", SqlValue::from(action.code())));
    columns.push(("previous_version", SqlValue::from(previous_version)));
    Ok(columns)
}
