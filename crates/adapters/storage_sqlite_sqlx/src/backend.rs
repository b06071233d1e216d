//! `SQLite` implementation of [`ResourceBackend`].
//!
//! Every mutation runs in one transaction and follows the same
//! write-ahead-then-stamp protocol:
//!
//! 1. append the `resource_history` row at version 0;
//! 2. insert, update or remove the live `resource` row;
//! 3. allocate the kind's next version;
//! 4. stamp that version onto the history row and the live row.
//!
//! Allocation comes last so the per-kind counter row is held for as short a
//! time as possible, and a failure anywhere rolls all four steps back.

use std::collections::{BTreeMap, BTreeSet};

use sqlx::SqliteConnection;

use unistore_app::ports::ResourceBackend;
use unistore_domain::error::{
    AlreadyExistsError, ConflictError, NotFoundError, UnistoreError, ValidationError,
};
use unistore_domain::history::Action;
use unistore_domain::id::ResourceGuid;
use unistore_domain::page::{self, HistoryToken, ListToken};
use unistore_domain::request::{
    DeleteRequest, HistoryRequest, HistoryResponse, ListFilter, ListRequest, ListResponse,
    ResourceReference,
};
use unistore_domain::resource::{Resource, ResourceKey};
use unistore_domain::response::HealthStatus;
use unistore_domain::time::now;

use crate::dialect::{Condition, Dialect, Order, Select, SqlValue};
use crate::error::{StorageError, is_unique_violation};
use crate::row::{
    HISTORY, HistoryWrapper, LABEL, REFERENCE, RESOURCE, Wrapper, history_columns, key_filter,
    mutable_columns, resource_columns,
};
use crate::tx::{TxExecutor, query, query_as};
use crate::version::next_version;

/// `SQLite`-backed versioned resource store.
#[derive(Debug, Clone)]
pub struct SqlResourceBackend {
    executor: TxExecutor,
}

impl SqlResourceBackend {
    /// Create a new backend running its transactions through `executor`.
    #[must_use]
    pub fn new(executor: TxExecutor) -> Self {
        Self { executor }
    }

    fn dialect(&self) -> Dialect {
        self.executor.dialect()
    }
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn check_expected(
    key: &ResourceKey,
    expected: Option<i64>,
    actual: i64,
) -> Result<(), ConflictError> {
    match expected {
        Some(expected) if expected != actual => Err(ConflictError {
            key: key.clone(),
            expected,
            actual,
        }),
        _ => Ok(()),
    }
}

async fn fetch_live(
    conn: &mut SqliteConnection,
    dialect: Dialect,
    key: &ResourceKey,
) -> Result<Option<Resource>, StorageError> {
    let select = dialect.select(Select::table(RESOURCE).filters(key_filter(key)))?;
    let row: Option<Wrapper> = query_as(&select).fetch_optional(&mut *conn).await?;
    Ok(Wrapper::maybe(row))
}

async fn append_history(
    conn: &mut SqliteConnection,
    dialect: Dialect,
    resource: &Resource,
    action: Action,
    previous_version: Option<i64>,
) -> Result<(), StorageError> {
    let insert = dialect.insert(HISTORY, history_columns(resource, action, previous_version)?)?;
    query(&insert).execute(&mut *conn).await?;
    Ok(())
}

async fn insert_live(
    conn: &mut SqliteConnection,
    dialect: Dialect,
    resource: &Resource,
) -> Result<(), StorageError> {
    let insert = dialect.insert(RESOURCE, resource_columns(resource)?)?;
    query(&insert).execute(&mut *conn).await?;
    Ok(())
}

async fn update_live(
    conn: &mut SqliteConnection,
    dialect: Dialect,
    resource: &Resource,
) -> Result<(), StorageError> {
    let update = dialect.update(
        RESOURCE,
        mutable_columns(resource)?,
        vec![Condition::eq("guid", resource.guid.to_string())],
    )?;
    query(&update).execute(&mut *conn).await?;
    Ok(())
}

/// Remove the live row and everything indexed under its guid.
async fn remove_live(
    conn: &mut SqliteConnection,
    dialect: Dialect,
    guid: &str,
) -> Result<(), StorageError> {
    for table in [RESOURCE, LABEL, REFERENCE] {
        let delete = dialect.delete(table, vec![Condition::eq("guid", guid)])?;
        query(&delete).execute(&mut *conn).await?;
    }
    Ok(())
}

/// Allocate the next version and write it over the version-0 placeholders.
async fn stamp(
    conn: &mut SqliteConnection,
    dialect: Dialect,
    resource: &mut Resource,
    live: bool,
) -> Result<(), StorageError> {
    let version = next_version(conn, dialect, &resource.key.kind()).await?;
    let guid = resource.guid.to_string();

    let history = dialect.update(
        HISTORY,
        vec![("version", SqlValue::Int(version))],
        vec![
            Condition::eq("guid", guid.as_str()),
            Condition::eq("version", 0_i64),
        ],
    )?;
    query(&history).execute(&mut *conn).await?;

    if live {
        let live = dialect.update(
            RESOURCE,
            vec![("version", SqlValue::Int(version))],
            vec![Condition::eq("guid", guid.as_str())],
        )?;
        query(&live).execute(&mut *conn).await?;
    }

    resource.version = version;
    Ok(())
}

async fn replace_labels(
    conn: &mut SqliteConnection,
    dialect: Dialect,
    guid: &str,
    labels: &BTreeMap<String, String>,
) -> Result<(), StorageError> {
    let delete = dialect.delete(LABEL, vec![Condition::eq("guid", guid)])?;
    query(&delete).execute(&mut *conn).await?;

    for (label, value) in labels {
        let insert = dialect.insert(
            LABEL,
            vec![
                ("guid", SqlValue::from(guid)),
                ("label", SqlValue::from(label.as_str())),
                ("value", SqlValue::from(value.as_str())),
            ],
        )?;
        query(&insert).execute(&mut *conn).await?;
    }
    Ok(())
}

fn list_select(filter: &ListFilter) -> Select {
    let mut select = Select::table(RESOURCE);
    if let Some(namespace) = &filter.namespace {
        select = select.filter(Condition::eq("namespace", namespace.as_str()));
    }
    if let Some(group) = &filter.group {
        select = select.filter(Condition::eq("group", group.as_str()));
    }
    if let Some(resource) = &filter.resource {
        select = select.filter(Condition::eq("resource", resource.as_str()));
    }
    if let Some(prefix) = &filter.name_prefix {
        select = select.filter(Condition::starts_with("name", prefix.as_str()));
    }
    if let Some(folder) = &filter.folder {
        select = select.filter(Condition::eq("folder", folder.as_str()));
    }
    for (label, value) in &filter.labels {
        let matching = Select::table(LABEL)
            .columns(&["guid"])
            .filter(Condition::eq("label", label.as_str()))
            .filter(Condition::eq("value", value.as_str()));
        select = select.filter(Condition::in_select("guid", matching));
    }
    by_key(select)
}

fn by_key(select: Select) -> Select {
    select
        .order_by("namespace", Order::Asc)
        .order_by("group", Order::Asc)
        .order_by("resource", Order::Asc)
        .order_by("name", Order::Asc)
}

impl ResourceBackend for SqlResourceBackend {
    async fn create(&self, mut resource: Resource) -> Result<Resource, UnistoreError> {
        let dialect = self.dialect();
        let mut tx = self.executor.begin().await?;

        if fetch_live(&mut tx, dialect, &resource.key).await?.is_some() {
            return Err(AlreadyExistsError { key: resource.key }.into());
        }

        resource.guid = ResourceGuid::new();
        resource.version = 0;
        resource.seal();

        append_history(&mut tx, dialect, &resource, Action::Created, None).await?;
        if let Err(err) = insert_live(&mut tx, dialect, &resource).await {
            return Err(match err {
                StorageError::Database(db) if is_unique_violation(&db) => {
                    AlreadyExistsError { key: resource.key }.into()
                }
                other => other.into(),
            });
        }
        stamp(&mut tx, dialect, &mut resource, true).await?;
        replace_labels(&mut tx, dialect, &resource.guid.to_string(), &resource.labels).await?;

        tx.commit().await.map_err(StorageError::from)?;
        tracing::debug!(key = %resource.key, version = resource.version, "resource created");
        Ok(resource)
    }

    async fn update(
        &self,
        patch: Resource,
        previous_version: Option<i64>,
    ) -> Result<Resource, UnistoreError> {
        let dialect = self.dialect();
        let mut tx = self.executor.begin().await?;

        let Some(mut current) = fetch_live(&mut tx, dialect, &patch.key).await? else {
            return Err(NotFoundError {
                key: patch.key,
                version: None,
            }
            .into());
        };
        check_expected(&patch.key, previous_version, current.version)?;

        let previous = current.version;
        current.merge(patch);
        current.version = 0;
        current.seal();

        append_history(&mut tx, dialect, &current, Action::Updated, Some(previous)).await?;
        update_live(&mut tx, dialect, &current).await?;
        stamp(&mut tx, dialect, &mut current, true).await?;
        replace_labels(&mut tx, dialect, &current.guid.to_string(), &current.labels).await?;

        tx.commit().await.map_err(StorageError::from)?;
        tracing::debug!(key = %current.key, version = current.version, "resource updated");
        Ok(current)
    }

    async fn delete(&self, request: DeleteRequest) -> Result<Resource, UnistoreError> {
        let dialect = self.dialect();
        let mut tx = self.executor.begin().await?;

        let Some(mut tombstone) = fetch_live(&mut tx, dialect, &request.key).await? else {
            return Err(NotFoundError {
                key: request.key,
                version: None,
            }
            .into());
        };
        check_expected(&request.key, request.previous_version, tombstone.version)?;

        let previous = tombstone.version;
        remove_live(&mut tx, dialect, &tombstone.guid.to_string()).await?;

        tombstone.version = 0;
        tombstone.updated_at = now();
        if !request.deleted_by.is_empty() {
            tombstone.updated_by = request.deleted_by;
        }
        tombstone.message = request.message;

        append_history(&mut tx, dialect, &tombstone, Action::Deleted, Some(previous)).await?;
        stamp(&mut tx, dialect, &mut tombstone, false).await?;

        tx.commit().await.map_err(StorageError::from)?;
        tracing::debug!(key = %tombstone.key, version = tombstone.version, "resource deleted");
        Ok(tombstone)
    }

    async fn read(
        &self,
        key: ResourceKey,
        version: Option<i64>,
    ) -> Result<Option<Resource>, UnistoreError> {
        let dialect = self.dialect();
        let mut conn = self
            .executor
            .pool()
            .acquire()
            .await
            .map_err(StorageError::from)?;

        let Some(version) = version else {
            return Ok(fetch_live(&mut conn, dialect, &key).await?);
        };

        let select = dialect
            .select(
                Select::table(HISTORY)
                    .filters(key_filter(&key))
                    .filter(Condition::eq("version", version)),
            )
            .map_err(StorageError::from)?;
        let row: Option<HistoryWrapper> = query_as(&select)
            .fetch_optional(&mut *conn)
            .await
            .map_err(StorageError::from)?;

        Ok(row.map(|w| w.0.resource))
    }

    async fn list(&self, request: ListRequest) -> Result<ListResponse, UnistoreError> {
        let limit = request.effective_limit();
        let offset = match &request.page_token {
            Some(token) => {
                let token: ListToken = page::decode(token)?;
                if token.start_offset < 0 {
                    return Err(ValidationError::InvalidPageToken.into());
                }
                token.start_offset
            }
            None => 0,
        };

        // One extra row tells whether another page follows.
        let select = list_select(&request.filter)
            .limit(to_i64(limit) + 1)
            .offset(offset);
        let statement = self.dialect().select(select).map_err(StorageError::from)?;
        let rows: Vec<Wrapper> = query_as(&statement)
            .fetch_all(self.executor.pool())
            .await
            .map_err(StorageError::from)?;

        let mut items: Vec<Resource> = rows.into_iter().map(|w| w.0).collect();
        let next_page_token = if items.len() > limit {
            items.truncate(limit);
            Some(page::encode(&ListToken {
                start_offset: offset + to_i64(limit),
            }))
        } else {
            None
        };

        Ok(ListResponse {
            items,
            next_page_token,
        })
    }

    async fn history(&self, request: HistoryRequest) -> Result<HistoryResponse, UnistoreError> {
        let limit = request.effective_limit();
        let mut select = Select::table(HISTORY).filters(key_filter(&request.key));
        if let Some(token) = &request.page_token {
            let token: HistoryToken = page::decode(token)?;
            select = select.filter(Condition::lt("version", token.before_version));
        }
        let select = select
            .order_by("version", Order::Desc)
            .limit(to_i64(limit) + 1);

        let statement = self.dialect().select(select).map_err(StorageError::from)?;
        let rows: Vec<HistoryWrapper> = query_as(&statement)
            .fetch_all(self.executor.pool())
            .await
            .map_err(StorageError::from)?;

        let mut versions: Vec<_> = rows.into_iter().map(|w| w.0).collect();
        let next_page_token = if versions.len() > limit {
            versions.truncate(limit);
            versions.last().map(|entry| {
                page::encode(&HistoryToken {
                    before_version: entry.version(),
                })
            })
        } else {
            None
        };

        Ok(HistoryResponse {
            versions,
            next_page_token,
        })
    }

    async fn find_references(
        &self,
        resource_type: String,
        uid: String,
    ) -> Result<Vec<Resource>, UnistoreError> {
        let referencing = Select::table(REFERENCE)
            .columns(&["guid"])
            .filter(Condition::eq("ref_resource", resource_type))
            .filter(Condition::eq("ref_uid", uid));
        let select =
            by_key(Select::table(RESOURCE).filter(Condition::in_select("guid", referencing)));

        let statement = self.dialect().select(select).map_err(StorageError::from)?;
        let rows: Vec<Wrapper> = query_as(&statement)
            .fetch_all(self.executor.pool())
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn index_references(
        &self,
        key: ResourceKey,
        references: Vec<ResourceReference>,
    ) -> Result<(), UnistoreError> {
        let dialect = self.dialect();
        let mut tx = self.executor.begin().await?;

        let Some(live) = fetch_live(&mut tx, dialect, &key).await? else {
            return Err(NotFoundError { key, version: None }.into());
        };
        let guid = live.guid.to_string();

        let delete = dialect
            .delete(REFERENCE, vec![Condition::eq("guid", guid.as_str())])
            .map_err(StorageError::from)?;
        query(&delete)
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;

        let unique: BTreeSet<ResourceReference> = references.into_iter().collect();
        for reference in unique {
            let insert = dialect
                .insert(
                    REFERENCE,
                    vec![
                        ("guid", SqlValue::from(guid.as_str())),
                        ("ref_resource", SqlValue::from(reference.resource_type)),
                        ("ref_uid", SqlValue::from(reference.uid)),
                    ],
                )
                .map_err(StorageError::from)?;
            query(&insert)
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?;
        }

        tx.commit().await.map_err(StorageError::from)?;
        Ok(())
    }

    async fn is_healthy(&self) -> HealthStatus {
        match sqlx::query("SELECT 1").execute(self.executor.pool()).await {
            Ok(_) => HealthStatus::Serving,
            Err(err) => {
                tracing::warn!(error = %err, "health check failed");
                HealthStatus::NotServing
            }
        }
    }
}
