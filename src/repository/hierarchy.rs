//! Categories and locations repository (materialized-path trees)

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{map_unique_violation, AppError, AppResult},
    hierarchy::{complete_name, is_within, node_path},
    models::catalog::{
        AccessLevel, Category, CategoryInput, Location, LocationInput, LocationType, ReferenceQuery,
    },
};

use super::like_pattern;

#[derive(Clone)]
pub struct HierarchyRepository {
    pool: Pool<Postgres>,
}

/// Path and display name of an existing node
struct NodeInfo {
    parent_path: String,
    complete_name: String,
}

async fn load_node(
    conn: &mut PgConnection,
    table: &'static str,
    id: i32,
) -> AppResult<Option<NodeInfo>> {
    let sql = format!(
        "SELECT parent_path, complete_name FROM {} WHERE id = $1 FOR UPDATE",
        table
    );
    let row = sqlx::query_as::<_, (String, String)>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(|(parent_path, complete_name)| NodeInfo {
        parent_path,
        complete_name,
    }))
}

/// Compute path and complete name of `id` under `parent_id`, rejecting cycles
async fn place_node(
    conn: &mut PgConnection,
    table: &'static str,
    label: &str,
    id: i32,
    parent_id: Option<i32>,
    name: &str,
    current_path: Option<&str>,
) -> AppResult<(String, String)> {
    let parent = match parent_id {
        Some(pid) => {
            if pid == id {
                return Err(AppError::Validation(format!("A {} cannot be its own parent", label)));
            }
            let parent = load_node(conn, table, pid)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Parent {} {} not found", label, pid)))?;
            if let Some(path) = current_path {
                if is_within(&parent.parent_path, path) {
                    return Err(AppError::Validation(format!(
                        "Recursive {} hierarchy is not allowed",
                        label
                    )));
                }
            }
            Some(parent)
        }
        None => None,
    };

    let path = node_path(parent.as_ref().map(|p| p.parent_path.as_str()), id);
    let full_name = complete_name(parent.as_ref().map(|p| p.complete_name.as_str()), name.trim());
    Ok((path, full_name))
}

/// Rewrite paths and names of every descendant after a move or rename
async fn rewrite_subtree(
    conn: &mut PgConnection,
    table: &'static str,
    id: i32,
    old: &NodeInfo,
    new_path: &str,
    new_name: &str,
) -> AppResult<()> {
    if old.parent_path == new_path && old.complete_name == new_name {
        return Ok(());
    }
    let sql = format!(
        r#"
        UPDATE {}
        SET parent_path = $2 || substr(parent_path, length($1) + 1),
            complete_name = $4 || substr(complete_name, length($3) + 1)
        WHERE parent_path LIKE $1 || '%' AND id <> $5
        "#,
        table
    );
    sqlx::query(&sql)
        .bind(&old.parent_path)
        .bind(new_path)
        .bind(&old.complete_name)
        .bind(new_name)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

impl HierarchyRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    // Categories

    pub async fn list_categories(&self, query: &ReferenceQuery) -> AppResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>(
            r#"
            SELECT * FROM categories
            WHERE ($1::text IS NULL OR complete_name ILIKE $1) AND ($2 OR active)
            ORDER BY parent_path, sequence, name
            "#,
        )
        .bind(query.name.as_deref().map(like_pattern))
        .bind(query.include_inactive.unwrap_or(false))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_category(&self, id: i32) -> AppResult<Category> {
        sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category with id {} not found", id)))
    }

    /// Ids of a category and all its descendants
    pub async fn category_subtree_ids(&self, id: i32) -> AppResult<Vec<i32>> {
        let ids = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT c.id FROM categories c, categories root
            WHERE root.id = $1 AND c.parent_path LIKE root.parent_path || '%' AND c.active
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    pub async fn create_category(&self, data: &CategoryInput) -> AppResult<Category> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO categories (name, slug, parent_id, sequence, access_level, is_website_menu, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(data.name.trim())
        .bind(&data.slug)
        .bind(data.parent_id)
        .bind(data.sequence)
        .bind(data.access_level.unwrap_or(AccessLevel::Public))
        .bind(data.is_website_menu)
        .bind(&data.description)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "Category slug already exists"))?;

        let (path, full_name) =
            place_node(&mut tx, "categories", "category", id, data.parent_id, &data.name, None).await?;

        let category = sqlx::query_as::<_, Category>(
            "UPDATE categories SET parent_path = $2, complete_name = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&path)
        .bind(&full_name)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(category)
    }

    pub async fn update_category(&self, id: i32, data: &CategoryInput) -> AppResult<Category> {
        let mut tx = self.pool.begin().await?;

        let old = load_node(&mut tx, "categories", id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category with id {} not found", id)))?;

        let (path, full_name) = place_node(
            &mut tx,
            "categories",
            "category",
            id,
            data.parent_id,
            &data.name,
            Some(&old.parent_path),
        )
        .await?;

        let category = sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories
            SET name = $2, slug = $3, parent_id = $4, sequence = $5, access_level = $6,
                is_website_menu = $7, description = $8, parent_path = $9, complete_name = $10
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.name.trim())
        .bind(&data.slug)
        .bind(data.parent_id)
        .bind(data.sequence)
        .bind(data.access_level.unwrap_or(AccessLevel::Public))
        .bind(data.is_website_menu)
        .bind(&data.description)
        .bind(&path)
        .bind(&full_name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "Category slug already exists"))?;

        rewrite_subtree(&mut tx, "categories", id, &old, &path, &full_name).await?;

        tx.commit().await?;
        Ok(category)
    }

    pub async fn archive_category(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("UPDATE categories SET active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Category with id {} not found", id)));
        }
        Ok(())
    }

    // Locations

    pub async fn list_locations(&self, query: &ReferenceQuery) -> AppResult<Vec<Location>> {
        let rows = sqlx::query_as::<_, Location>(
            r#"
            SELECT * FROM locations
            WHERE ($1::text IS NULL OR complete_name ILIKE $1 OR code ILIKE $1) AND ($2 OR active)
            ORDER BY parent_path, name
            "#,
        )
        .bind(query.name.as_deref().map(like_pattern))
        .bind(query.include_inactive.unwrap_or(false))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_location(&self, id: i32) -> AppResult<Location> {
        sqlx::query_as::<_, Location>("SELECT * FROM locations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Location with id {} not found", id)))
    }

    pub async fn create_location(&self, data: &LocationInput) -> AppResult<Location> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO locations (name, code, location_type, parent_id, capacity, is_borrow_location)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(data.name.trim())
        .bind(&data.code)
        .bind(data.location_type.unwrap_or(LocationType::Shelf))
        .bind(data.parent_id)
        .bind(data.capacity)
        .bind(data.is_borrow_location)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "Location code already exists"))?;

        let (path, full_name) =
            place_node(&mut tx, "locations", "location", id, data.parent_id, &data.name, None).await?;

        let location = sqlx::query_as::<_, Location>(
            "UPDATE locations SET parent_path = $2, complete_name = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&path)
        .bind(&full_name)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(location)
    }

    pub async fn update_location(&self, id: i32, data: &LocationInput) -> AppResult<Location> {
        let mut tx = self.pool.begin().await?;

        let old = load_node(&mut tx, "locations", id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Location with id {} not found", id)))?;

        let (path, full_name) = place_node(
            &mut tx,
            "locations",
            "location",
            id,
            data.parent_id,
            &data.name,
            Some(&old.parent_path),
        )
        .await?;

        let location = sqlx::query_as::<_, Location>(
            r#"
            UPDATE locations
            SET name = $2, code = $3, location_type = $4, parent_id = $5, capacity = $6,
                is_borrow_location = $7, parent_path = $8, complete_name = $9
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.name.trim())
        .bind(&data.code)
        .bind(data.location_type.unwrap_or(LocationType::Shelf))
        .bind(data.parent_id)
        .bind(data.capacity)
        .bind(data.is_borrow_location)
        .bind(&path)
        .bind(&full_name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "Location code already exists"))?;

        rewrite_subtree(&mut tx, "locations", id, &old, &path, &full_name).await?;

        tx.commit().await?;
        Ok(location)
    }

    pub async fn archive_location(&self, id: i32) -> AppResult<()> {
        let in_use: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM book_quants WHERE location_id = $1 AND active)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        if in_use {
            return Err(AppError::BusinessRule(
                "Location still holds active copies".to_string(),
            ));
        }

        let result = sqlx::query("UPDATE locations SET active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Location with id {} not found", id)));
        }
        Ok(())
    }
}
