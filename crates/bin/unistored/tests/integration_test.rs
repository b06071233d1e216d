//! End-to-end tests for the full unistored stack.
//!
//! Each test wires the real pieces together (in-memory `SQLite`, the SQL
//! backend, the resource service, the history poller and the folder-index
//! rebuilder) without going through `main`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_stream::StreamExt;
use unistore_adapter_storage_sqlite_sqlx::{Config, Database, SqlHistoryFeed, SqlResourceBackend};
use unistore_app::event_bus::InProcessEventBus;
use unistore_app::folder_rebuilder::{self, FolderIndexRebuilder};
use unistore_app::poller::{HistoryPoller, PollerConfig};
use unistore_app::ports::StaticIdentity;
use unistore_app::services::resource_service::ResourceService;
use unistore_domain::error::UnistoreError;
use unistore_domain::history::Action;
use unistore_domain::request::{DeleteRequest, HistoryRequest, ReadOptions};
use unistore_domain::resource::{Resource, ResourceKey};
use unistore_domain::response::{HealthStatus, WriteResponse, WriteStatus};

type Service = ResourceService<SqlResourceBackend, StaticIdentity>;

struct Stack {
    db: Database,
    bus: Arc<InProcessEventBus>,
    service: Service,
}

/// Build a fully-wired service backed by an in-memory `SQLite` database.
async fn stack() -> Stack {
    let db = Config::in_memory()
        .build()
        .await
        .expect("in-memory database should initialise");
    let bus = Arc::new(InProcessEventBus::new(64));
    let service = ResourceService::new(db.backend(), StaticIdentity::new("system"), bus.clone());
    Stack { db, bus, service }
}

fn poller(stack: &Stack) -> HistoryPoller<SqlHistoryFeed, Arc<InProcessEventBus>> {
    HistoryPoller::new(
        stack.db.history_feed(),
        stack.bus.clone(),
        PollerConfig {
            interval: Duration::from_millis(10),
            batch_size: 2,
        },
    )
}

fn key(name: &str) -> ResourceKey {
    ResourceKey::new("ns1", "dashboard.app", "dashboards", name)
}

fn dashboard(name: &str, title: &str) -> Resource {
    Resource::builder()
        .key(key(name))
        .group_version("v1")
        .body(format!(r#"{{"title":"{title}"}}"#))
        .build()
}

fn patch(name: &str, title: &str) -> Resource {
    Resource {
        key: key(name),
        body: format!(r#"{{"title":"{title}"}}"#).into_bytes(),
        ..Resource::default()
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_record_full_history_when_resource_goes_through_lifecycle() {
    let Stack { service, .. } = stack().await;

    let created = service.create(dashboard("a", "one")).await.unwrap();
    assert_eq!(created.version, 1);
    assert_eq!(created.created_by, "system");

    let updated = service.update(patch("a", "two"), Some(1)).await.unwrap();
    assert_eq!(updated.version, 2);
    assert_eq!(updated.created_by, "system");
    assert_eq!(updated.group_version, "v1");

    let deleted = service
        .delete(DeleteRequest::new(key("a")).previous_version(2))
        .await
        .unwrap();
    assert_eq!(deleted.version, 3);

    let err = service
        .read(key("a"), None, ReadOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, UnistoreError::NotFound(_)));

    let first = service
        .read(key("a"), Some(1), ReadOptions::default())
        .await
        .unwrap();
    assert_eq!(first.body, br#"{"title":"one"}"#);

    let history = service.history(HistoryRequest::new(key("a"))).await.unwrap();
    let versions: Vec<(i64, Action)> = history
        .versions
        .iter()
        .map(|entry| (entry.version(), entry.action))
        .collect();
    assert_eq!(
        versions,
        vec![(3, Action::Deleted), (2, Action::Updated), (1, Action::Created)]
    );
}

#[tokio::test]
async fn should_reject_second_writer_when_versions_race() {
    let Stack { service, .. } = stack().await;
    service.create(dashboard("a", "one")).await.unwrap();

    service.update(patch("a", "left"), Some(1)).await.unwrap();
    let err = service
        .update(patch("a", "right"), Some(1))
        .await
        .unwrap_err();

    assert!(matches!(err, UnistoreError::Conflict(_)));
    let live = service
        .read(key("a"), None, ReadOptions::default())
        .await
        .unwrap();
    assert_eq!(live.body, br#"{"title":"left"}"#);
    assert_eq!(live.version, 2);
}

#[tokio::test]
async fn should_report_status_when_wrapping_results() {
    let Stack { service, .. } = stack().await;

    let created = WriteResponse::created(service.create(dashboard("a", "one")).await);
    let duplicate = WriteResponse::created(service.create(dashboard("a", "one")).await);
    let missing = WriteResponse::deleted(service.delete(DeleteRequest::new(key("zz"))).await);

    assert_eq!(created.status, WriteStatus::Created);
    assert_eq!(duplicate.status, WriteStatus::Error);
    assert_eq!(duplicate.resource, Resource::default());
    assert!(matches!(duplicate.error, Some(UnistoreError::AlreadyExists(_))));
    assert_eq!(missing.status, WriteStatus::NotFound);
}

// ---------------------------------------------------------------------------
// Watch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_publish_every_change_in_order_when_poller_ticks() {
    let stack = stack().await;
    let mut poller = poller(&stack);
    poller.initialize().await.unwrap();
    let mut events = Box::pin(stack.service.watch());

    stack.service.create(dashboard("a", "one")).await.unwrap();
    stack.service.update(patch("a", "two"), None).await.unwrap();
    stack
        .service
        .delete(DeleteRequest::new(key("a")))
        .await
        .unwrap();
    let published = poller.tick().await.unwrap();
    assert_eq!(published, 3);

    let mut seen = Vec::new();
    for _ in 0..3 {
        let event = tokio::time::timeout(Duration::from_secs(1), events.next())
            .await
            .unwrap()
            .unwrap();
        seen.push((event.version, event.action, event.previous_version));
    }
    assert_eq!(
        seen,
        vec![
            (1, Action::Created, None),
            (2, Action::Updated, Some(1)),
            (3, Action::Deleted, Some(2)),
        ]
    );
    assert_eq!(poller.tick().await.unwrap(), 0);
}

#[tokio::test]
async fn should_skip_existing_history_when_poller_starts() {
    let stack = stack().await;
    stack.service.create(dashboard("old", "one")).await.unwrap();

    let mut poller = poller(&stack);
    poller.initialize().await.unwrap();
    let mut events = Box::pin(stack.service.watch());
    stack.service.create(dashboard("new", "one")).await.unwrap();
    poller.tick().await.unwrap();

    let event = tokio::time::timeout(Duration::from_secs(1), events.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.key, key("new"));
    assert_eq!(event.version, 2);
}

#[tokio::test]
async fn should_deliver_events_and_stop_when_running_in_background() {
    let stack = stack().await;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(poller(&stack).run(shutdown_rx));
    let mut events = Box::pin(stack.service.watch());

    // Writes racing the poller's baseline are not published; keep writing
    // until one lands after it.
    let delivered = tokio::time::timeout(Duration::from_secs(5), async {
        let mut n = 0;
        loop {
            n += 1;
            stack
                .service
                .create(dashboard(&format!("d{n}"), "x"))
                .await
                .unwrap();
            if let Ok(Some(event)) =
                tokio::time::timeout(Duration::from_millis(100), events.next()).await
            {
                return event;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(delivered.action, Action::Created);

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

// ---------------------------------------------------------------------------
// Folders
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_rebuild_folder_index_when_folder_written() {
    let Stack { db, bus, .. } = stack().await;
    let (folder_tx, folder_rx) = folder_rebuilder::channel();
    let service = ResourceService::new(db.backend(), StaticIdentity::new("system"), bus)
        .with_folder_events(folder_tx);
    let rebuilder = tokio::spawn(FolderIndexRebuilder::new(db.folder_index(), folder_rx).run());

    for (name, parent) in [("root", None), ("child", Some("root"))] {
        let mut builder = Resource::builder()
            .key(ResourceKey::new("ns1", "folder.app", "folders", name))
            .body("{}");
        if let Some(parent) = parent {
            builder = builder.folder(parent);
        }
        service.create(builder.build()).await.unwrap();
    }

    let index = db.folder_index();
    let nodes = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let nodes = index.folders("ns1").await.unwrap();
            if nodes.len() == 2 {
                return nodes;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(nodes[1].path, "root/child");
    assert_eq!(nodes[1].depth, 2);

    drop(service);
    tokio::time::timeout(Duration::from_secs(1), rebuilder)
        .await
        .unwrap()
        .unwrap();
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_report_serving_when_database_is_open() {
    let Stack { db, service, .. } = stack().await;
    assert_eq!(service.is_healthy().await, HealthStatus::Serving);

    db.pool().close().await;
    assert_eq!(service.is_healthy().await, HealthStatus::NotServing);
}
