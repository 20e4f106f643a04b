//! Categories and themes
//!
//! The catalog above roadmaps. Deleting a parent removes its children
//! explicitly (themes, then roadmaps and their graphs) in one transaction.

use rusqlite::{params, Connection, OptionalExtension};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{self, Database};
use crate::error::{CoreError, Result};
use crate::model::{Category, Theme};
use crate::roadmap::conn_delete_roadmap;

#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub code: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub order_index: f64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryUpdate {
    pub code: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub order_index: Option<f64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTheme {
    pub category_id: Uuid,
    pub code: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub order_index: f64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThemeUpdate {
    pub category_id: Option<Uuid>,
    pub code: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub order_index: Option<f64>,
    pub is_active: Option<bool>,
}

fn default_active() -> bool {
    true
}

pub(crate) fn conn_get_category(conn: &Connection, id: Uuid) -> Result<Option<Category>> {
    let sql = format!("SELECT {} FROM categories WHERE id = ?1", Category::COLUMNS);
    Ok(conn
        .query_row(&sql, params![id.to_string()], Category::from_row)
        .optional()?)
}

pub(crate) fn conn_get_theme(conn: &Connection, id: Uuid) -> Result<Option<Theme>> {
    let sql = format!("SELECT {} FROM themes WHERE id = ?1", Theme::COLUMNS);
    Ok(conn
        .query_row(&sql, params![id.to_string()], Theme::from_row)
        .optional()?)
}

fn conn_delete_theme(conn: &Connection, theme_id: Uuid) -> Result<()> {
    let mut stmt = conn.prepare("SELECT id FROM roadmaps WHERE theme_id = ?1")?;
    let roadmap_ids = stmt
        .query_map(params![theme_id.to_string()], |row| db::get_uuid(row, 0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    for roadmap_id in roadmap_ids {
        conn_delete_roadmap(conn, roadmap_id)?;
    }
    conn.execute("DELETE FROM themes WHERE id = ?1", params![theme_id.to_string()])?;
    Ok(())
}

/// Category and theme operations
pub struct Catalog {
    db: Arc<Database>,
}

impl Catalog {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn create_category(&self, input: NewCategory) -> Result<Category> {
        let now = db::now();
        let category = Category {
            id: Uuid::new_v4(),
            code: input.code,
            title: input.title,
            description: input.description,
            order_index: input.order_index,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        };
        self.db.write(|tx| {
            tx.execute(
                "INSERT INTO categories (id, code, title, description, order_index, is_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    category.id.to_string(),
                    category.code,
                    category.title,
                    category.description,
                    category.order_index,
                    category.is_active,
                    db::to_sql_time(&category.created_at),
                    db::to_sql_time(&category.updated_at),
                ],
            )?;
            Ok(())
        })?;
        tracing::info!("Created category {} ({})", category.code, category.id);
        Ok(category)
    }

    pub async fn get_category(&self, id: Uuid) -> Result<Category> {
        self.db
            .read(|conn| conn_get_category(conn, id))?
            .ok_or(CoreError::CategoryNotFound(id))
    }

    pub async fn list_categories(&self, is_active: Option<bool>) -> Result<Vec<Category>> {
        self.db.read(|conn| {
            let sql = format!(
                "SELECT {} FROM categories WHERE (?1 IS NULL OR is_active = ?1) ORDER BY order_index, rowid",
                Category::COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![is_active], Category::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub async fn update_category(&self, id: Uuid, update: CategoryUpdate) -> Result<Category> {
        self.db.write(|tx| {
            let mut category = conn_get_category(tx, id)?.ok_or(CoreError::CategoryNotFound(id))?;
            if let Some(code) = update.code {
                category.code = code;
            }
            if let Some(title) = update.title {
                category.title = title;
            }
            if let Some(description) = update.description {
                category.description = Some(description);
            }
            if let Some(order_index) = update.order_index {
                category.order_index = order_index;
            }
            if let Some(is_active) = update.is_active {
                category.is_active = is_active;
            }
            category.updated_at = db::now();

            tx.execute(
                "UPDATE categories SET code = ?2, title = ?3, description = ?4, order_index = ?5,
                 is_active = ?6, updated_at = ?7 WHERE id = ?1",
                params![
                    id.to_string(),
                    category.code,
                    category.title,
                    category.description,
                    category.order_index,
                    category.is_active,
                    db::to_sql_time(&category.updated_at),
                ],
            )?;
            Ok(category)
        })
    }

    /// Delete a category with its themes and their roadmaps
    pub async fn delete_category(&self, id: Uuid) -> Result<()> {
        self.db.write(|tx| {
            conn_get_category(tx, id)?.ok_or(CoreError::CategoryNotFound(id))?;
            let mut stmt = tx.prepare("SELECT id FROM themes WHERE category_id = ?1")?;
            let theme_ids = stmt
                .query_map(params![id.to_string()], |row| db::get_uuid(row, 0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for theme_id in theme_ids {
                conn_delete_theme(tx, theme_id)?;
            }
            tx.execute("DELETE FROM categories WHERE id = ?1", params![id.to_string()])?;
            Ok(())
        })?;
        tracing::info!("Deleted category {}", id);
        Ok(())
    }

    pub async fn create_theme(&self, input: NewTheme) -> Result<Theme> {
        let now = db::now();
        let theme = Theme {
            id: Uuid::new_v4(),
            category_id: input.category_id,
            code: input.code,
            title: input.title,
            description: input.description,
            order_index: input.order_index,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        };
        self.db.write(|tx| {
            conn_get_category(tx, theme.category_id)?
                .ok_or(CoreError::CategoryNotFound(theme.category_id))?;
            tx.execute(
                "INSERT INTO themes (id, category_id, code, title, description, order_index, is_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    theme.id.to_string(),
                    theme.category_id.to_string(),
                    theme.code,
                    theme.title,
                    theme.description,
                    theme.order_index,
                    theme.is_active,
                    db::to_sql_time(&theme.created_at),
                    db::to_sql_time(&theme.updated_at),
                ],
            )?;
            Ok(())
        })?;
        tracing::info!("Created theme {} ({})", theme.code, theme.id);
        Ok(theme)
    }

    pub async fn get_theme(&self, id: Uuid) -> Result<Theme> {
        self.db
            .read(|conn| conn_get_theme(conn, id))?
            .ok_or(CoreError::ThemeNotFound(id))
    }

    pub async fn list_themes(
        &self,
        category_id: Option<Uuid>,
        is_active: Option<bool>,
    ) -> Result<Vec<Theme>> {
        self.db.read(|conn| {
            let sql = format!(
                "SELECT {} FROM themes
                 WHERE (?1 IS NULL OR category_id = ?1) AND (?2 IS NULL OR is_active = ?2)
                 ORDER BY order_index, rowid",
                Theme::COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    params![category_id.map(|id| id.to_string()), is_active],
                    Theme::from_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub async fn update_theme(&self, id: Uuid, update: ThemeUpdate) -> Result<Theme> {
        self.db.write(|tx| {
            let mut theme = conn_get_theme(tx, id)?.ok_or(CoreError::ThemeNotFound(id))?;
            if let Some(category_id) = update.category_id {
                if category_id != theme.category_id {
                    conn_get_category(tx, category_id)?
                        .ok_or(CoreError::CategoryNotFound(category_id))?;
                    theme.category_id = category_id;
                }
            }
            if let Some(code) = update.code {
                theme.code = code;
            }
            if let Some(title) = update.title {
                theme.title = title;
            }
            if let Some(description) = update.description {
                theme.description = Some(description);
            }
            if let Some(order_index) = update.order_index {
                theme.order_index = order_index;
            }
            if let Some(is_active) = update.is_active {
                theme.is_active = is_active;
            }
            theme.updated_at = db::now();

            tx.execute(
                "UPDATE themes SET category_id = ?2, code = ?3, title = ?4, description = ?5,
                 order_index = ?6, is_active = ?7, updated_at = ?8 WHERE id = ?1",
                params![
                    id.to_string(),
                    theme.category_id.to_string(),
                    theme.code,
                    theme.title,
                    theme.description,
                    theme.order_index,
                    theme.is_active,
                    db::to_sql_time(&theme.updated_at),
                ],
            )?;
            Ok(theme)
        })
    }

    /// Delete a theme with its roadmaps
    pub async fn delete_theme(&self, id: Uuid) -> Result<()> {
        self.db.write(|tx| {
            conn_get_theme(tx, id)?.ok_or(CoreError::ThemeNotFound(id))?;
            conn_delete_theme(tx, id)
        })?;
        tracing::info!("Deleted theme {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::new(Arc::new(Database::open_in_memory().unwrap()))
    }

    fn new_category(code: &str, order_index: f64) -> NewCategory {
        NewCategory {
            code: code.to_string(),
            title: code.to_uppercase(),
            description: None,
            order_index,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_category_crud() {
        let catalog = catalog();
        let web = catalog.create_category(new_category("web", 2.0)).await.unwrap();
        catalog.create_category(new_category("data", 1.0)).await.unwrap();

        let listed = catalog.list_categories(None).await.unwrap();
        let codes: Vec<_> = listed.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["data", "web"]);

        let updated = catalog
            .update_category(
                web.id,
                CategoryUpdate {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!updated.is_active);
        assert_eq!(updated.title, "WEB");
        assert_eq!(catalog.list_categories(Some(true)).await.unwrap().len(), 1);

        catalog.delete_category(web.id).await.unwrap();
        assert!(matches!(
            catalog.get_category(web.id).await.unwrap_err(),
            CoreError::CategoryNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_code_conflicts() {
        let catalog = catalog();
        catalog.create_category(new_category("web", 1.0)).await.unwrap();
        let err = catalog.create_category(new_category("web", 2.0)).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_theme_requires_category() {
        let catalog = catalog();
        let err = catalog
            .create_theme(NewTheme {
                category_id: Uuid::new_v4(),
                code: "frontend".into(),
                title: "Frontend".into(),
                description: None,
                order_index: 1.0,
                is_active: true,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::CategoryNotFound(_)));
    }

    #[tokio::test]
    async fn test_theme_move_and_cascade_delete() {
        let catalog = catalog();
        let web = catalog.create_category(new_category("web", 1.0)).await.unwrap();
        let data = catalog.create_category(new_category("data", 2.0)).await.unwrap();
        let theme = catalog
            .create_theme(NewTheme {
                category_id: web.id,
                code: "frontend".into(),
                title: "Frontend".into(),
                description: Some("UI".into()),
                order_index: 1.0,
                is_active: true,
            })
            .await
            .unwrap();

        let err = catalog
            .update_theme(
                theme.id,
                ThemeUpdate {
                    category_id: Some(Uuid::new_v4()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::CategoryNotFound(_)));

        let moved = catalog
            .update_theme(
                theme.id,
                ThemeUpdate {
                    category_id: Some(data.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.category_id, data.id);
        assert_eq!(catalog.list_themes(Some(web.id), None).await.unwrap().len(), 0);

        catalog.delete_category(data.id).await.unwrap();
        assert!(matches!(
            catalog.get_theme(theme.id).await.unwrap_err(),
            CoreError::ThemeNotFound(_)
        ));
    }
}
