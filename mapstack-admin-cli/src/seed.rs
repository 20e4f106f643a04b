//! Sample data for local development
//!
//! Creates a small catalog, a published frontend roadmap and a few
//! documents with revision history linked to its nodes. Categories and
//! themes that already exist (matched by code) are reused.

use anyhow::Result;
use mapstack_core::document::DEFAULT_RELATION_TYPE;
use mapstack_core::{
    BumpRequest, Catalog, Category, DocumentContent, DocumentRevisionManager, DocumentSection,
    EdgeInput, NewCategory, NewTheme, NodeInput, RoadmapVersioner, Theme,
};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

/// (code, title, description, order)
const CATEGORIES: &[(&str, &str, &str, f64)] = &[
    ("web-development", "Web Development", "Building for the browser and the server", 1.0),
    ("data-science", "Data Science", "Analysis, statistics and machine learning", 2.0),
];

/// (category code, code, title, description, order)
const THEMES: &[(&str, &str, &str, &str, f64)] = &[
    ("web-development", "frontend", "Frontend", "HTML, CSS, JavaScript and UI frameworks", 1.0),
    ("web-development", "backend", "Backend", "APIs, databases and services", 2.0),
    ("data-science", "python-data", "Python for Data", "NumPy, pandas and plotting", 1.0),
];

/// (handle, title, x, y, required)
const FRONTEND_NODES: &[(&str, &str, f64, f64, bool)] = &[
    ("html-basics", "HTML Basics", 0.0, 0.0, true),
    ("semantic-html", "Semantic HTML", 0.0, 120.0, false),
    ("css-basics", "CSS Basics", 250.0, 0.0, true),
    ("javascript-basics", "JavaScript Basics", 500.0, 0.0, true),
    ("react-basics", "React Basics", 750.0, 0.0, false),
];

/// (handle, source, target)
const FRONTEND_EDGES: &[(&str, &str, &str)] = &[
    ("html-to-semantic", "html-basics", "semantic-html"),
    ("html-to-css", "html-basics", "css-basics"),
    ("css-to-js", "css-basics", "javascript-basics"),
    ("js-to-react", "javascript-basics", "react-basics"),
];

/// What a seed run created
#[derive(Debug, Serialize)]
pub struct SeedSummary {
    pub categories: usize,
    pub themes: usize,
    pub roadmap_id: Uuid,
    pub nodes: usize,
    pub edges: usize,
    pub documents: Vec<SeededDocument>,
}

#[derive(Debug, Serialize)]
pub struct SeededDocument {
    pub id: Uuid,
    pub title: String,
    pub version: String,
    pub nodes: Vec<String>,
}

struct SampleDocument {
    title: &'static str,
    description: &'static str,
    revisions: Vec<(&'static str, Vec<(&'static str, &'static str)>)>,
    nodes: &'static [&'static str],
}

fn sample_documents() -> Vec<SampleDocument> {
    let what_is_html = ("What is HTML", "HTML is the markup language that defines the structure of a web page.");
    let structure = (
        "Document structure",
        "An HTML document starts with <!DOCTYPE html> and is made of html, head and body elements.",
    );
    vec![
        SampleDocument {
            title: "HTML Basics",
            description: "The basic structure of HTML and its main tags",
            revisions: vec![
                ("Initial version", vec![what_is_html, structure]),
                (
                    "Add a section on semantic tags",
                    vec![
                        what_is_html,
                        structure,
                        (
                            "Semantic HTML",
                            "Semantic HTML gives tags meaning, for example article, section and nav.",
                        ),
                    ],
                ),
            ],
            nodes: &["html-basics", "semantic-html"],
        },
        SampleDocument {
            title: "Introduction to CSS",
            description: "Styling web pages with CSS",
            revisions: vec![(
                "Initial version",
                vec![
                    ("What is CSS", "CSS is the language that describes how a web page looks."),
                    ("Selectors", "A selector chooses the elements a rule applies to."),
                ],
            )],
            nodes: &["css-basics"],
        },
        SampleDocument {
            title: "JavaScript Fundamentals",
            description: "The core of JavaScript programming",
            revisions: vec![(
                "Initial version",
                vec![
                    ("What is JavaScript", "JavaScript adds behaviour to web pages."),
                    ("Variables and constants", "Declare variables with let and constants with const."),
                ],
            )],
            nodes: &["javascript-basics"],
        },
    ]
}

fn content(title: &str, sections: &[(&str, &str)]) -> DocumentContent {
    DocumentContent::new(
        title,
        sections
            .iter()
            .map(|(t, c)| DocumentSection::new(*t, *c))
            .collect(),
    )
}

pub async fn run(
    catalog: &Catalog,
    roadmaps: &RoadmapVersioner,
    documents: &DocumentRevisionManager,
) -> Result<SeedSummary> {
    let categories = seed_categories(catalog).await?;
    let themes = seed_themes(catalog, &categories).await?;

    let frontend = themes
        .get("frontend")
        .ok_or_else(|| anyhow::anyhow!("frontend theme missing after seeding"))?;
    if !roadmaps.list_versions(frontend.id).await?.is_empty() {
        anyhow::bail!("theme 'frontend' already has roadmaps; sample data is already present");
    }

    let roadmap = roadmaps
        .create_roadmap(
            frontend.id,
            "Frontend Development",
            Some("From the fundamentals of the web to UI frameworks"),
        )
        .await?;

    let mut node_ids = HashMap::new();
    for (handle, title, x, y, required) in FRONTEND_NODES {
        let mut input = NodeInput::new(*handle, "topic", *title);
        input.position_x = *x;
        input.position_y = *y;
        input.is_required = *required;
        input.metadata = serde_json::json!({ "concepts": [title] });
        let node = roadmaps.add_node(roadmap.id, input).await?;
        node_ids.insert(*handle, node.id);
    }
    for (handle, source, target) in FRONTEND_EDGES {
        let input = EdgeInput::new(*handle, node_ids[source], node_ids[target]);
        roadmaps.add_edge(roadmap.id, input).await?;
    }
    let roadmap = roadmaps.publish(roadmap.id).await?;
    info!("Seeded roadmap {} ({})", roadmap.id, roadmap.version);

    let mut seeded = Vec::new();
    for sample in sample_documents() {
        let mut revisions = sample.revisions.iter();
        let Some((_, first)) = revisions.next() else {
            continue;
        };
        let document = documents
            .create_document(sample.title, Some(sample.description), &content(sample.title, first), None)
            .await?;
        let mut version = "1.0.0".to_string();
        for (summary, sections) in revisions {
            let (_, revision) = documents
                .update_document(
                    document.id,
                    &content(sample.title, sections),
                    BumpRequest::Auto,
                    Some(*summary),
                    None,
                )
                .await?;
            version = revision.version;
        }

        for handle in sample.nodes {
            if let Some(node_id) = node_ids.get(handle) {
                documents
                    .link_node_document(*node_id, document.id, DEFAULT_RELATION_TYPE, None)
                    .await?;
            }
        }

        seeded.push(SeededDocument {
            id: document.id,
            title: document.title,
            version,
            nodes: sample.nodes.iter().map(|h| h.to_string()).collect(),
        });
    }

    Ok(SeedSummary {
        categories: categories.len(),
        themes: themes.len(),
        roadmap_id: roadmap.id,
        nodes: FRONTEND_NODES.len(),
        edges: FRONTEND_EDGES.len(),
        documents: seeded,
    })
}

async fn seed_categories(catalog: &Catalog) -> Result<HashMap<&'static str, Category>> {
    let existing = catalog.list_categories(None).await?;
    let mut out = HashMap::new();
    for (code, title, description, order_index) in CATEGORIES {
        let category = match existing.iter().find(|c| c.code == *code) {
            Some(category) => category.clone(),
            None => {
                catalog
                    .create_category(NewCategory {
                        code: code.to_string(),
                        title: title.to_string(),
                        description: Some(description.to_string()),
                        order_index: *order_index,
                        is_active: true,
                    })
                    .await?
            }
        };
        out.insert(*code, category);
    }
    Ok(out)
}

async fn seed_themes(
    catalog: &Catalog,
    categories: &HashMap<&'static str, Category>,
) -> Result<HashMap<&'static str, Theme>> {
    let existing = catalog.list_themes(None, None).await?;
    let mut out = HashMap::new();
    for (category_code, code, title, description, order_index) in THEMES {
        let Some(category) = categories.get(category_code) else {
            tracing::warn!("No category '{}' for theme '{}'", category_code, code);
            continue;
        };
        let theme = match existing.iter().find(|t| t.code == *code) {
            Some(theme) => theme.clone(),
            None => {
                catalog
                    .create_theme(NewTheme {
                        category_id: category.id,
                        code: code.to_string(),
                        title: title.to_string(),
                        description: Some(description.to_string()),
                        order_index: *order_index,
                        is_active: true,
                    })
                    .await?
            }
        };
        out.insert(*code, theme);
    }
    Ok(out)
}
