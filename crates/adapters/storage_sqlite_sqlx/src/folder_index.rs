//! `SQLite` implementation of [`FolderIndex`].
//!
//! The `resource_folder` table is derived data: for every live folder-kind
//! resource of a namespace it stores the resolved parent, depth and path.
//! Each group of a namespace holds its own tree. A rebuild recomputes the
//! whole namespace in one transaction.

use std::collections::{BTreeMap, BTreeSet};

use unistore_app::ports::FolderIndex;
use unistore_domain::error::UnistoreError;
use unistore_domain::resource::FOLDER_RESOURCE;

use crate::dialect::{Condition, Order, Select, SqlValue};
use crate::error::StorageError;
use crate::row::RESOURCE;
use crate::tx::{TxExecutor, query, query_as};

const TABLE: &str = "resource_folder";

/// One folder of the resolved tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderNode {
    pub group: String,
    pub name: String,
    /// `None` for top-level folders.
    pub parent: Option<String>,
    /// 1 for top-level folders.
    pub depth: i64,
    /// Folder names from the root down to this folder, `/`-separated.
    pub path: String,
}

/// Resolve `name -> declared parent` into a tree.
///
/// A folder whose parent does not exist, or whose parent link closes a
/// cycle, is attached to the root. Cycles are cut at the last folder reached
/// when walking up from the lexicographically smallest member.
fn build_tree(group: &str, declared: &BTreeMap<String, Option<String>>) -> Vec<FolderNode> {
    let mut parents: BTreeMap<&str, Option<&str>> = declared
        .iter()
        .map(|(name, parent)| {
            let parent = parent
                .as_deref()
                .filter(|p| *p != name.as_str() && declared.contains_key(*p));
            (name.as_str(), parent)
        })
        .collect();

    let names: Vec<&str> = parents.keys().copied().collect();
    for &name in &names {
        let mut seen = BTreeSet::from([name]);
        let mut current = name;
        while let Some(&Some(next)) = parents.get(current) {
            if !seen.insert(next) {
                parents.insert(current, None);
                break;
            }
            current = next;
        }
    }

    names
        .iter()
        .map(|&name| {
            let mut chain = vec![name];
            let mut current = name;
            while let Some(&Some(parent)) = parents.get(current) {
                chain.push(parent);
                current = parent;
            }
            chain.reverse();
            FolderNode {
                group: group.to_string(),
                name: name.to_string(),
                parent: parents.get(name).copied().flatten().map(str::to_string),
                depth: i64::try_from(chain.len()).unwrap_or(i64::MAX),
                path: chain.join("/"),
            }
        })
        .collect()
}

/// Rebuilds `resource_folder` from live folder resources.
#[derive(Debug, Clone)]
pub struct SqlFolderIndex {
    executor: TxExecutor,
}

impl SqlFolderIndex {
    #[must_use]
    pub fn new(executor: TxExecutor) -> Self {
        Self { executor }
    }

    /// The resolved trees of `namespace`, ordered by group then path.
    ///
    /// # Errors
    ///
    /// Returns [`UnistoreError::BackendUnavailable`] when the query fails.
    pub async fn folders(&self, namespace: &str) -> Result<Vec<FolderNode>, UnistoreError> {
        let select = Select::table(TABLE)
            .columns(&["group", "name", "parent", "depth", "path"])
            .filter(Condition::eq("namespace", namespace))
            .order_by("group", Order::Asc)
            .order_by("path", Order::Asc);
        let statement = self
            .executor
            .dialect()
            .select(select)
            .map_err(StorageError::from)?;

        let rows: Vec<(String, String, Option<String>, i64, String)> = query_as(&statement)
            .fetch_all(self.executor.pool())
            .await
            .map_err(StorageError::from)?;

        Ok(rows
            .into_iter()
            .map(|(group, name, parent, depth, path)| FolderNode {
                group,
                name,
                parent,
                depth,
                path,
            })
            .collect())
    }
}

impl FolderIndex for SqlFolderIndex {
    async fn rebuild(&self, namespace: String) -> Result<(), UnistoreError> {
        let dialect = self.executor.dialect();
        let mut tx = self.executor.begin().await?;

        let select = Select::table(RESOURCE)
            .columns(&["group", "name", "folder"])
            .filter(Condition::eq("namespace", namespace.as_str()))
            .filter(Condition::eq("resource", FOLDER_RESOURCE));
        let statement = dialect.select(select).map_err(StorageError::from)?;
        let rows: Vec<(String, String, Option<String>)> = query_as(&statement)
            .fetch_all(&mut *tx)
            .await
            .map_err(StorageError::from)?;

        let mut groups: BTreeMap<String, BTreeMap<String, Option<String>>> = BTreeMap::new();
        for (group, name, parent) in rows {
            groups.entry(group).or_default().insert(name, parent);
        }
        let nodes: Vec<FolderNode> = groups
            .iter()
            .flat_map(|(group, declared)| build_tree(group, declared))
            .collect();

        let delete = dialect
            .delete(TABLE, vec![Condition::eq("namespace", namespace.as_str())])
            .map_err(StorageError::from)?;
        query(&delete)
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;

        for node in &nodes {
            let insert = dialect
                .insert(
                    TABLE,
                    vec![
                        ("namespace", SqlValue::from(namespace.as_str())),
                        ("group", SqlValue::from(node.group.as_str())),
                        ("name", SqlValue::from(node.name.as_str())),
                        ("parent", SqlValue::from(node.parent.as_deref())),
                        ("depth", SqlValue::Int(node.depth)),
                        ("path", SqlValue::from(node.path.as_str())),
                    ],
                )
                .map_err(StorageError::from)?;
            query(&insert)
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?;
        }

        tx.commit().await.map_err(StorageError::from)?;
        tracing::debug!(%namespace, folders = nodes.len(), "folder tree rebuilt");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unistore_app::ports::ResourceBackend;
    use unistore_domain::request::DeleteRequest;
    use unistore_domain::resource::{Resource, ResourceKey};

    use crate::pool::Config;

    fn declared(pairs: &[(&str, Option<&str>)]) -> BTreeMap<String, Option<String>> {
        pairs
            .iter()
            .map(|(name, parent)| ((*name).to_string(), parent.map(str::to_string)))
            .collect()
    }

    fn paths(nodes: &[FolderNode]) -> Vec<(&str, &str, i64)> {
        nodes
            .iter()
            .map(|n| (n.name.as_str(), n.path.as_str(), n.depth))
            .collect()
    }

    #[test]
    fn should_resolve_nested_folders() {
        let nodes = build_tree("folder.app", &declared(&[
            ("a", None),
            ("b", Some("a")),
            ("c", Some("b")),
        ]));

        assert_eq!(
            paths(&nodes),
            vec![("a", "a", 1), ("b", "a/b", 2), ("c", "a/b/c", 3)]
        );
        assert_eq!(nodes[2].parent.as_deref(), Some("b"));
    }

    #[test]
    fn should_attach_orphans_to_root() {
        let nodes = build_tree(
            "folder.app",
            &declared(&[("a", Some("missing")), ("b", Some("a"))]),
        );

        assert_eq!(paths(&nodes), vec![("a", "a", 1), ("b", "a/b", 2)]);
        assert_eq!(nodes[0].parent, None);
    }

    #[test]
    fn should_cut_cycles() {
        let nodes = build_tree("folder.app", &declared(&[
            ("a", Some("b")),
            ("b", Some("a")),
            ("c", Some("c")),
            ("d", Some("a")),
        ]));

        assert_eq!(
            paths(&nodes),
            vec![("a", "b/a", 2), ("b", "b", 1), ("c", "c", 1), ("d", "b/a/d", 3)]
        );
    }

    fn folder(name: &str, parent: Option<&str>) -> Resource {
        folder_in("folder.app", name, parent)
    }

    fn folder_in(group: &str, name: &str, parent: Option<&str>) -> Resource {
        let mut builder = Resource::builder()
            .key(ResourceKey::new("ns1", group, "folders", name))
            .body("{}");
        if let Some(parent) = parent {
            builder = builder.folder(parent);
        }
        builder.build()
    }

    #[tokio::test]
    async fn should_rebuild_namespace_from_live_folders() {
        let db = Config::in_memory().build().await.unwrap();
        let backend = db.backend();
        let index = db.folder_index();
        backend.create(folder("root", None)).await.unwrap();
        backend.create(folder("child", Some("root"))).await.unwrap();
        backend.create(folder("gone", Some("root"))).await.unwrap();

        index.rebuild("ns1".to_string()).await.unwrap();
        assert_eq!(index.folders("ns1").await.unwrap().len(), 3);

        backend
            .delete(DeleteRequest::new(ResourceKey::new(
                "ns1",
                "folder.app",
                "folders",
                "gone",
            )))
            .await
            .unwrap();
        index.rebuild("ns1".to_string()).await.unwrap();

        let nodes = index.folders("ns1").await.unwrap();
        assert_eq!(paths(&nodes), vec![("root", "root", 1), ("child", "root/child", 2)]);
        assert!(index.folders("ns2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_keep_one_tree_per_group() {
        let db = Config::in_memory().build().await.unwrap();
        let backend = db.backend();
        let index = db.folder_index();
        backend.create(folder_in("a.app", "shared", None)).await.unwrap();
        backend.create(folder_in("b.app", "shared", None)).await.unwrap();
        backend
            .create(folder_in("b.app", "inner", Some("shared")))
            .await
            .unwrap();

        index.rebuild("ns1".to_string()).await.unwrap();

        let nodes = index.folders("ns1").await.unwrap();
        let listed: Vec<(&str, &str)> = nodes
            .iter()
            .map(|n| (n.group.as_str(), n.path.as_str()))
            .collect();
        assert_eq!(
            listed,
            vec![("a.app", "shared"), ("b.app", "shared"), ("b.app", "shared/inner")]
        );
    }
}
