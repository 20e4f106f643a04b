//! Roadmap publishing and version cloning integration tests

use mapstack_core::{
    Catalog, CoreError, Database, EdgeInput, NewCategory, NewTheme, NodeInput, NodeUpdate,
    RoadmapVersioner,
};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

async fn setup() -> (RoadmapVersioner, Uuid) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let catalog = Catalog::new(db.clone());
    let category = catalog
        .create_category(NewCategory {
            code: "web-development".into(),
            title: "Web Development".into(),
            description: None,
            order_index: 1.0,
            is_active: true,
        })
        .await
        .unwrap();
    let theme = catalog
        .create_theme(NewTheme {
            category_id: category.id,
            code: "frontend".into(),
            title: "Frontend".into(),
            description: None,
            order_index: 1.0,
            is_active: true,
        })
        .await
        .unwrap();
    (RoadmapVersioner::new(db), theme.id)
}

#[tokio::test]
async fn test_publish_empty_roadmap_fails() {
    let (versioner, theme_id) = setup().await;
    let roadmap = versioner.create_roadmap(theme_id, "React", None).await.unwrap();

    let err = versioner.publish(roadmap.id).await.unwrap_err();
    assert!(matches!(err, CoreError::EmptyRoadmap(_)));
}

#[tokio::test]
async fn test_publish_disconnected_roadmap_fails() {
    let (versioner, theme_id) = setup().await;
    let roadmap = versioner.create_roadmap(theme_id, "React", None).await.unwrap();
    versioner.add_node(roadmap.id, NodeInput::new("a", "topic", "A")).await.unwrap();
    versioner.add_node(roadmap.id, NodeInput::new("b", "topic", "B")).await.unwrap();

    let err = versioner.publish(roadmap.id).await.unwrap_err();
    assert!(matches!(err, CoreError::DisconnectedRoadmap(_)));
}

#[tokio::test]
async fn test_publish_single_node_succeeds_once() {
    let (versioner, theme_id) = setup().await;
    let roadmap = versioner.create_roadmap(theme_id, "React", None).await.unwrap();
    versioner.add_node(roadmap.id, NodeInput::new("a", "topic", "A")).await.unwrap();

    let published = versioner.publish(roadmap.id).await.unwrap();
    assert!(published.is_published);
    assert!(published.published_at.is_some());

    let err = versioner.publish(roadmap.id).await.unwrap_err();
    assert!(matches!(err, CoreError::AlreadyPublished(_)));
}

#[tokio::test]
async fn test_publish_missing_roadmap() {
    let (versioner, _) = setup().await;
    let err = versioner.publish(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, CoreError::RoadmapNotFound(_)));
}

#[tokio::test]
async fn test_published_roadmap_is_immutable() {
    let (versioner, theme_id) = setup().await;
    let roadmap = versioner.create_roadmap(theme_id, "React", None).await.unwrap();
    let a = versioner.add_node(roadmap.id, NodeInput::new("a", "topic", "A")).await.unwrap();
    let b = versioner.add_node(roadmap.id, NodeInput::new("b", "topic", "B")).await.unwrap();
    let edge = versioner.add_edge(roadmap.id, EdgeInput::new("ab", a.id, b.id)).await.unwrap();
    versioner.publish(roadmap.id).await.unwrap();

    let immutable = |err: CoreError| matches!(err, CoreError::PublishedRoadmapImmutable(_));
    assert!(immutable(
        versioner
            .add_node(roadmap.id, NodeInput::new("c", "topic", "C"))
            .await
            .unwrap_err()
    ));
    assert!(immutable(
        versioner
            .update_node(roadmap.id, a.id, NodeUpdate::default())
            .await
            .unwrap_err()
    ));
    assert!(immutable(versioner.delete_node(roadmap.id, a.id).await.unwrap_err()));
    assert!(immutable(
        versioner
            .add_edge(roadmap.id, EdgeInput::new("ba", b.id, a.id))
            .await
            .unwrap_err()
    ));
    assert!(immutable(versioner.delete_edge(roadmap.id, edge.id).await.unwrap_err()));
}

#[tokio::test]
async fn test_clone_requires_published_source() {
    let (versioner, theme_id) = setup().await;
    let roadmap = versioner.create_roadmap(theme_id, "React", None).await.unwrap();

    let err = versioner.clone_for_new_version(roadmap.id, "2.0.0").await.unwrap_err();
    assert!(matches!(err, CoreError::SourceNotPublished(_)));
}

#[tokio::test]
async fn test_clone_version_checks() {
    let (versioner, theme_id) = setup().await;
    let roadmap = versioner.create_roadmap(theme_id, "React", None).await.unwrap();
    versioner.add_node(roadmap.id, NodeInput::new("a", "topic", "A")).await.unwrap();
    versioner.publish(roadmap.id).await.unwrap();

    for label in ["1.0.0", "0.9.9"] {
        let err = versioner.clone_for_new_version(roadmap.id, label).await.unwrap_err();
        assert!(matches!(err, CoreError::VersionNotNewer { .. }), "{}", label);
    }
    let err = versioner.clone_for_new_version(roadmap.id, "1.1").await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidVersionFormat(_)));

    // Failed attempts leave the source as latest
    assert!(versioner.get_roadmap(roadmap.id).await.unwrap().is_latest);
}

#[tokio::test]
async fn test_clone_remaps_graph() {
    let (versioner, theme_id) = setup().await;
    let source = versioner.create_roadmap(theme_id, "React", Some("Learn React")).await.unwrap();
    let mut basics = NodeInput::new("react-basics", "topic", "React Basics");
    basics.position_x = 10.0;
    basics.metadata = serde_json::json!({"estimated_hours": 8});
    basics.is_required = true;
    let a = versioner.add_node(source.id, basics).await.unwrap();
    let b = versioner
        .add_node(source.id, NodeInput::new("component-design", "topic", "Component Design"))
        .await
        .unwrap();
    let c = versioner
        .add_node(source.id, NodeInput::new("state-management", "topic", "State Management"))
        .await
        .unwrap();
    versioner.add_edge(source.id, EdgeInput::new("e1", a.id, b.id)).await.unwrap();
    versioner.add_edge(source.id, EdgeInput::new("e2", b.id, c.id)).await.unwrap();
    versioner.publish(source.id).await.unwrap();

    let clone = versioner.clone_for_new_version(source.id, "1.1.0").await.unwrap();
    assert_eq!(clone.version, "1.1.0");
    assert_eq!(clone.theme_id, theme_id);
    assert_eq!(clone.title, "React");
    assert_eq!(clone.description.as_deref(), Some("Learn React"));
    assert!(!clone.is_published);
    assert!(clone.is_latest);
    assert!(!versioner.get_roadmap(source.id).await.unwrap().is_latest);

    let old_graph = versioner.get_roadmap_graph(source.id).await.unwrap();
    let new_graph = versioner.get_roadmap_graph(clone.id).await.unwrap();
    assert_eq!(new_graph.nodes.len(), 3);
    assert_eq!(new_graph.edges.len(), 2);

    let old_ids: HashSet<_> = old_graph.nodes.iter().map(|n| n.id).collect();
    let new_ids: HashSet<_> = new_graph.nodes.iter().map(|n| n.id).collect();
    assert!(old_ids.is_disjoint(&new_ids));
    for edge in &new_graph.edges {
        assert_eq!(edge.roadmap_id, clone.id);
        assert!(new_ids.contains(&edge.source_node_id));
        assert!(new_ids.contains(&edge.target_node_id));
    }

    let copied = new_graph
        .nodes
        .iter()
        .find(|n| n.handle == "react-basics")
        .unwrap();
    assert_eq!(copied.position_x, 10.0);
    assert_eq!(copied.metadata["estimated_hours"], 8);
    assert!(copied.is_required);

    // The copy is a draft and can be edited independently
    versioner
        .add_node(clone.id, NodeInput::new("hooks", "topic", "Hooks"))
        .await
        .unwrap();
    assert_eq!(versioner.get_roadmap_graph(source.id).await.unwrap().nodes.len(), 3);
}

#[tokio::test]
async fn test_list_versions_newest_first() {
    let (versioner, theme_id) = setup().await;
    let v1 = versioner.create_roadmap(theme_id, "React", None).await.unwrap();
    versioner.add_node(v1.id, NodeInput::new("a", "topic", "A")).await.unwrap();
    versioner.publish(v1.id).await.unwrap();
    let v2 = versioner.clone_for_new_version(v1.id, "1.1.0").await.unwrap();
    versioner.publish(v2.id).await.unwrap();
    let v3 = versioner.clone_for_new_version(v2.id, "2.0.0").await.unwrap();

    let versions = versioner.list_versions(theme_id).await.unwrap();
    let labels: Vec<_> = versions.iter().map(|v| v.version.as_str()).collect();
    assert_eq!(labels, vec!["2.0.0", "1.1.0", "1.0.0"]);

    let latest: Vec<_> = versions.iter().filter(|v| v.is_latest).collect();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].id, v3.id);
    assert!(versions[1].is_published);
    assert!(!versions[0].is_published);
}
