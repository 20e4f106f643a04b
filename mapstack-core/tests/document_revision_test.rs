//! Document revision integration tests
//!
//! Run against a file-backed database and the local content store.

use mapstack_core::{
    BumpKind, BumpRequest, Catalog, ContentStore, CoreError, Database, DocumentContent,
    DocumentRevisionManager, DocumentSection, LocalContentStore, NewCategory, NewTheme, NodeInput,
    RoadmapVersioner,
};
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

struct Fixture {
    _dir: TempDir,
    db: Arc<Database>,
    store: Arc<dyn ContentStore>,
    manager: DocumentRevisionManager,
}

async fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let db = Arc::new(Database::open(&dir.path().join("mapstack.sqlite")).unwrap());
    let store: Arc<dyn ContentStore> =
        Arc::new(LocalContentStore::open(dir.path().join("storage")).await.unwrap());
    let manager = DocumentRevisionManager::new(db.clone(), store.clone());
    Fixture {
        _dir: dir,
        db,
        store,
        manager,
    }
}

fn content(title: &str, sections: &[(&str, &str)]) -> DocumentContent {
    DocumentContent::new(
        title,
        sections.iter().map(|(t, c)| DocumentSection::new(*t, *c)).collect(),
    )
}

/// A draft roadmap node to link documents against
async fn node(db: &Arc<Database>, handle: &str) -> Uuid {
    let catalog = Catalog::new(db.clone());
    let category = catalog
        .create_category(NewCategory {
            code: format!("cat-{}", handle),
            title: "Category".into(),
            description: None,
            order_index: 1.0,
            is_active: true,
        })
        .await
        .unwrap();
    let theme = catalog
        .create_theme(NewTheme {
            category_id: category.id,
            code: format!("theme-{}", handle),
            title: "Theme".into(),
            description: None,
            order_index: 1.0,
            is_active: true,
        })
        .await
        .unwrap();
    let versioner = RoadmapVersioner::new(db.clone());
    let roadmap = versioner.create_roadmap(theme.id, "Roadmap", None).await.unwrap();
    versioner
        .add_node(roadmap.id, NodeInput::new(handle, "topic", handle))
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_section_added_is_minor_and_diffed() {
    let f = fixture().await;
    let doc = f
        .manager
        .create_document("A", None, &content("A", &[("S1", "x")]), None)
        .await
        .unwrap();

    let latest = f.manager.get_latest_revision(doc.id).await.unwrap().unwrap();
    assert_eq!(latest.version, "1.0.0");

    let (_, revision) = f
        .manager
        .update_document(
            doc.id,
            &content("A", &[("S1", "x"), ("S2", "y")]),
            BumpRequest::Auto,
            None,
            None,
        )
        .await
        .unwrap();
    assert_eq!(revision.version, "1.1.0");

    let diff = f.manager.compute_diff(doc.id, "1.0.0", "1.1.0").await.unwrap();
    assert_eq!(diff.from_version, "1.0.0");
    assert_eq!(diff.to_version, "1.1.0");
    assert_eq!(diff.sections_added, vec![DocumentSection::new("S2", "y")]);
    assert!(diff.sections_removed.is_empty());
    assert!(diff.sections_modified.is_empty());
}

#[tokio::test]
async fn test_small_edit_is_patch() {
    let f = fixture().await;
    let original = "The quick brown fox jumps over the lazy dog.";
    let doc = f
        .manager
        .create_document("A", None, &content("A", &[("S1", original)]), None)
        .await
        .unwrap();

    let edited = format!("{} 123456789", original);
    let (_, revision) = f
        .manager
        .update_document(doc.id, &content("A", &[("S1", &edited)]), BumpRequest::Auto, None, None)
        .await
        .unwrap();
    assert_eq!(revision.version, "1.0.1");

    let diff = f.manager.compute_diff(doc.id, "1.0.0", "1.0.1").await.unwrap();
    assert_eq!(diff.sections_modified.len(), 1);
    assert_eq!(diff.sections_modified[0].old_content, original);
    assert_eq!(diff.sections_modified[0].new_content, edited);
}

#[tokio::test]
async fn test_content_round_trips_through_store() {
    let f = fixture().await;
    let initial = content("HTMLの基礎", &[("概要", "HTMLはウェブページの構造を定義します。")]);
    let doc = f
        .manager
        .create_document("HTMLの基礎", Some("intro"), &initial, None)
        .await
        .unwrap();

    let revision = f.manager.get_latest_revision(doc.id).await.unwrap().unwrap();
    assert_eq!(f.manager.load_content(&revision.storage_key).await.unwrap(), initial);

    let (latest, loaded) = f.manager.get_latest_content(doc.id).await.unwrap();
    assert_eq!(latest.id, revision.id);
    assert_eq!(loaded, initial);
}

#[tokio::test]
async fn test_prior_revisions_are_preserved() {
    let f = fixture().await;
    let v1 = content("A", &[("S1", "x")]);
    let doc = f.manager.create_document("A", None, &v1, None).await.unwrap();

    let v2 = content("A", &[("S1", "y")]);
    let actor = Uuid::new_v4();
    f.manager
        .update_document(doc.id, &v2, BumpRequest::Explicit(BumpKind::Minor), Some("edit"), Some(actor))
        .await
        .unwrap();

    let (_, at_v1) = f.manager.get_content_at(doc.id, "1.0.0").await.unwrap();
    let (rev_v2, at_v2) = f.manager.get_content_at(doc.id, "1.1.0").await.unwrap();
    assert_eq!(at_v1, v1);
    assert_eq!(at_v2, v2);
    assert_eq!(rev_v2.created_by, Some(actor));
    assert_eq!(rev_v2.change_summary.as_deref(), Some("edit"));

    let history = f.manager.list_revisions(doc.id).await.unwrap();
    let versions: Vec<_> = history.iter().map(|r| r.version.as_str()).collect();
    assert_eq!(versions, vec!["1.1.0", "1.0.0"]);
}

#[tokio::test]
async fn test_missing_blob_is_content_not_found() {
    let f = fixture().await;
    let doc = f
        .manager
        .create_document("A", None, &content("A", &[]), None)
        .await
        .unwrap();
    let revision = f.manager.get_latest_revision(doc.id).await.unwrap().unwrap();
    assert!(f.store.delete(&revision.storage_key).await.unwrap());

    let err = f.manager.get_latest_content(doc.id).await.unwrap_err();
    assert!(matches!(err, CoreError::ContentNotFound(_)));
}

#[tokio::test]
async fn test_link_upsert_and_ordering() {
    let f = fixture().await;
    let node_id = node(&f.db, "react-basics").await;
    let a = f
        .manager
        .create_document("A", None, &content("A", &[]), None)
        .await
        .unwrap();
    let b = f
        .manager
        .create_document("B", None, &content("B", &[]), None)
        .await
        .unwrap();

    let first = f.manager.link_node_document(node_id, a.id, "primary", None).await.unwrap();
    assert_eq!(first.order_position, 100);
    let second = f.manager.link_node_document(node_id, b.id, "primary", None).await.unwrap();
    assert_eq!(second.order_position, 200);

    // Same pair again updates in place
    let again = f
        .manager
        .link_node_document(node_id, a.id, "supplementary", Some(300))
        .await
        .unwrap();
    assert_eq!(again.id, first.id);
    assert_eq!(again.relation_type, "supplementary");
    assert_eq!(again.order_position, 300);

    let kept = f.manager.link_node_document(node_id, a.id, "primary", None).await.unwrap();
    assert_eq!(kept.order_position, 300);

    let (node, documents) = f.manager.get_node_documents(node_id).await.unwrap();
    assert_eq!(node.id, node_id);
    let titles: Vec<_> = documents.iter().map(|d| d.title.as_str()).collect();
    assert_eq!(titles, vec!["B", "A"]);

    assert!(f.manager.unlink_node_document(node_id, b.id).await.unwrap());
    assert!(!f.manager.unlink_node_document(node_id, b.id).await.unwrap());
    let (_, documents) = f.manager.get_node_documents(node_id).await.unwrap();
    assert_eq!(documents.len(), 1);
}

#[tokio::test]
async fn test_documents_listed_by_recent_update() {
    let f = fixture().await;
    let a = f
        .manager
        .create_document("A", None, &content("A", &[]), None)
        .await
        .unwrap();
    f.manager
        .create_document("B", None, &content("B", &[]), None)
        .await
        .unwrap();
    f.manager
        .update_document(a.id, &content("A", &[("S", "s")]), BumpRequest::Auto, None, None)
        .await
        .unwrap();

    let listed = f.manager.list_documents().await.unwrap();
    let titles: Vec<_> = listed.iter().map(|d| d.title.as_str()).collect();
    assert_eq!(titles, vec!["A", "B"]);
}
