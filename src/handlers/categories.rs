use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    database::{AppState, Database},
    error::{map_restrict, map_unique, ApiError, ApiResult},
    models::{Category, CategoryInput, CategoryPayload, SubcategoryMeta, SubcategoryPayload},
};

const SUBCATEGORY_META_SELECT: &str = r#"
    SELECT s.id, s.name, s.slug, s.category_id, s.icon, s.description,
           c.name AS category_name,
           (SELECT COUNT(*) FROM products p
             WHERE p.subcategory_id = s.id AND p.is_active = TRUE) AS product_count
    FROM subcategories s
    JOIN categories c ON c.id = s.category_id
"#;

#[derive(Debug, Default, Deserialize)]
pub struct CategoryListQuery {
    navbar: Option<bool>,
}

async fn active_subcategories_by_category(
    db: &Database,
) -> Result<HashMap<Uuid, Vec<SubcategoryPayload>>, sqlx::Error> {
    let rows = sqlx::query_as::<_, SubcategoryMeta>(&format!(
        "{} WHERE s.is_active = TRUE ORDER BY c.name, s.name",
        SUBCATEGORY_META_SELECT
    ))
    .fetch_all(db)
    .await?;

    let mut grouped: HashMap<Uuid, Vec<SubcategoryPayload>> = HashMap::new();
    for row in rows {
        grouped
            .entry(row.category_id)
            .or_default()
            .push(SubcategoryPayload::from(row));
    }
    Ok(grouped)
}

// List active categories with their active subcategories; ?navbar=true
// restricts to navbar entries.
pub async fn categories_list(
    State(state): State<AppState>,
    Query(query): Query<CategoryListQuery>,
) -> ApiResult<Json<Vec<CategoryPayload>>> {
    let sql = if query.navbar.unwrap_or(false) {
        "SELECT * FROM categories
         WHERE is_active = TRUE AND show_in_navbar = TRUE
         ORDER BY navbar_order, name"
    } else {
        "SELECT * FROM categories WHERE is_active = TRUE ORDER BY navbar_order, name"
    };

    let categories = sqlx::query_as::<_, Category>(sql).fetch_all(&state.db).await?;
    let mut subcategories = active_subcategories_by_category(&state.db).await?;

    let payload = categories
        .into_iter()
        .map(|category| {
            let subs = subcategories.remove(&category.id).unwrap_or_default();
            CategoryPayload::from_parts(category, subs)
        })
        .collect();

    Ok(Json(payload))
}

pub async fn category_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<CategoryPayload>> {
    let category = sqlx::query_as::<_, Category>(
        "SELECT * FROM categories WHERE slug = $1 AND is_active = TRUE",
    )
    .bind(&slug)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("category '{}' not found", slug)))?;

    let subcategories = sqlx::query_as::<_, SubcategoryMeta>(&format!(
        "{} WHERE s.is_active = TRUE AND s.category_id = $1 ORDER BY s.name",
        SUBCATEGORY_META_SELECT
    ))
    .bind(category.id)
    .fetch_all(&state.db)
    .await?
    .into_iter()
    .map(SubcategoryPayload::from)
    .collect();

    Ok(Json(CategoryPayload::from_parts(category, subcategories)))
}

// Admin: create a category
pub async fn create_category(
    State(state): State<AppState>,
    Json(input): Json<CategoryInput>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let input = input.normalized();
    input.validate()?;

    let category = sqlx::query_as::<_, Category>(
        r#"
        INSERT INTO categories (name, slug, icon, description, is_active, show_in_navbar, navbar_order)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(&input.name)
    .bind(&input.slug)
    .bind(&input.icon)
    .bind(&input.description)
    .bind(input.is_active)
    .bind(input.show_in_navbar)
    .bind(input.navbar_order)
    .fetch_one(&state.db)
    .await
    .map_err(|e| map_unique(e, "a category with this name or slug already exists"))?;

    Ok((StatusCode::CREATED, Json(category)))
}

// Admin: update a category
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<CategoryInput>,
) -> ApiResult<Json<Category>> {
    let input = input.normalized();
    input.validate()?;

    let category = sqlx::query_as::<_, Category>(
        r#"
        UPDATE categories
        SET name = $2, slug = $3, icon = $4, description = $5,
            is_active = $6, show_in_navbar = $7, navbar_order = $8,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&input.name)
    .bind(&input.slug)
    .bind(&input.icon)
    .bind(&input.description)
    .bind(input.is_active)
    .bind(input.show_in_navbar)
    .bind(input.navbar_order)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| map_unique(e, "a category with this name or slug already exists"))?
    .ok_or_else(|| ApiError::NotFound("category not found".to_string()))?;

    Ok(Json(category))
}

// Admin: delete a category; subcategories go with it. Blocked while any
// subcategory still has products.
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await
        .map_err(|e| {
            map_restrict(e, "category has subcategories that still contain products")
        })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("category not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
